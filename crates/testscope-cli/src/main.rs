use clap::{Parser, Subcommand};
use color_eyre::eyre::{bail, WrapErr};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use testscope_core::{Config, Explorer};

mod output;
mod progress;

use output::StderrNotifier;
use progress::RunProgress;

#[derive(Parser)]
#[command(name = "testscope")]
#[command(about = "Discover and run Go tests with a live status tree", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file to use instead of the default locations
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the discovered test tree
    Discover {
        /// Workspace root
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Print the tree as JSON
        #[arg(long)]
        json: bool,
    },
    /// Discover, then run all tests, one file, or one test
    Run {
        /// Workspace root
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Run only this test file
        #[arg(long)]
        file: Option<PathBuf>,

        /// Run only this test function (requires --file)
        #[arg(long, requires = "file")]
        test: Option<String>,

        /// Maximum concurrent `go test` processes
        #[arg(short = 'j', long)]
        jobs: Option<usize>,
    },
    /// Print the default configuration
    Config,
}

#[tokio::main]
async fn main() -> color_eyre::Result<ExitCode> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Discover { path, json } => {
            let config = load_config(cli.config.as_deref(), &path)?;
            let mut explorer = open(&path, config)?;
            let report = explorer.refresh().await;
            if let Some(err) = report.error {
                return Err(err).wrap_err("discovery failed");
            }

            if json {
                println!("{}", serde_json::to_string_pretty(explorer.store().suites())?);
            } else {
                output::print_tree(explorer.store().suites(), explorer.workspace());
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Run {
            path,
            file,
            test,
            jobs,
        } => {
            let mut config = load_config(cli.config.as_deref(), &path)?;
            if let Some(jobs) = jobs {
                config.runner.max_parallel = jobs;
            }
            let mut explorer = open(&path, config)?;
            let report = explorer.refresh().await;
            if let Some(err) = report.error {
                return Err(err).wrap_err("discovery failed");
            }

            let progress = RunProgress::new();
            explorer.subscribe(progress.observer());

            let ids = match (&file, &test) {
                (Some(file), Some(name)) => {
                    let file = absolute(file)?;
                    match explorer.run_case(&file, name) {
                        Some(id) => vec![id],
                        None => bail!("no test {} in {}", name, file.display()),
                    }
                }
                (Some(file), None) => {
                    let file = absolute(file)?;
                    if explorer.store().find_suite(&file).is_none() {
                        bail!("{} is not a discovered test file", file.display());
                    }
                    explorer.run_suite(&file).into_iter().collect()
                }
                _ => explorer.run_all(),
            };

            if ids.is_empty() {
                println!("No tests to run.");
                return Ok(ExitCode::SUCCESS);
            }

            progress.start(ids.len());
            explorer.wait_idle().await;
            progress.finish();

            output::print_results(explorer.store().suites(), explorer.workspace());
            let summary = explorer.store().summary();
            output::print_summary(&summary);

            if summary.failed > 0 {
                Ok(ExitCode::FAILURE)
            } else {
                Ok(ExitCode::SUCCESS)
            }
        }
        Commands::Config => {
            print!("{}", Config::default_config_string());
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("TESTSCOPE_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// `--config` wins; otherwise the workspace's own `testscope.toml` is used.
fn load_config(path: Option<&Path>, workspace: &Path) -> color_eyre::Result<Config> {
    let config = match path {
        Some(path) => Config::from_file(path)
            .wrap_err_with(|| format!("loading {}", path.display()))?,
        None => Config::load_for(workspace)?,
    };
    debug!(?config, "configuration loaded");
    Ok(config)
}

fn open(path: &Path, config: Config) -> color_eyre::Result<Explorer> {
    let workspace = absolute(path)?;
    let mut explorer = Explorer::with_go_tooling(workspace, config)?;
    explorer.set_notifier(Arc::new(StderrNotifier));
    Ok(explorer)
}

/// Canonical form, so paths match the ones discovery records.
fn absolute(path: &Path) -> color_eyre::Result<PathBuf> {
    std::fs::canonicalize(path).wrap_err_with(|| format!("cannot open {}", path.display()))
}
