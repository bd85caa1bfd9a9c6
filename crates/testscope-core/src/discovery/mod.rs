//! Test discovery: walk a root, find test files, ask the symbol provider for
//! their functions and assemble the suite tree.
//!
//! A pass publishes `DiscoveryStarted` up front and a single `Discovered`
//! once every per-file lookup has resolved. Partial trees are never
//! published. Files whose lookup failed still appear, as empty suites, and
//! the failure is reported through the [`Notifier`].

mod error;
mod go;
mod symbols;
mod walker;

pub use error::{DiscoveryError, LookupError};
pub use go::GoSymbolProvider;
pub use symbols::{Symbol, SymbolKind, SymbolProvider, TestSymbolFilter};
pub use walker::{collect_test_files, WalkOutcome};

use futures::future::join_all;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::{ConfigError, DiscoveryConfig, DEFAULT_SRC_DIR};
use crate::events::{Event, EventSink};
use crate::model::{TestCase, TestSuite};
use crate::notify::Notifier;

/// Result of one discovery pass.
#[derive(Debug, Default)]
pub struct DiscoveryReport {
    /// Suites in walk order, cases sorted by name.
    pub suites: Vec<TestSuite>,
    /// Non-fatal problems: unreadable directories, files that failed to parse.
    pub warnings: Vec<DiscoveryError>,
    /// Set when the pass failed as a whole and an empty tree was published.
    pub error: Option<DiscoveryError>,
}

impl DiscoveryReport {
    pub fn case_count(&self) -> usize {
        self.suites.iter().map(|s| s.children.len()).sum()
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

pub struct DiscoveryEngine {
    config: DiscoveryConfig,
    filter: TestSymbolFilter,
    provider: Arc<dyn SymbolProvider>,
}

impl DiscoveryEngine {
    pub fn new(config: DiscoveryConfig, provider: Arc<dyn SymbolProvider>) -> Result<Self, ConfigError> {
        let filter = TestSymbolFilter::from_config(&config)?;
        Ok(Self {
            config,
            filter,
            provider,
        })
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// Picks `<workspace>/src` when configured and present, else the workspace itself.
    pub fn resolve_root(&self, workspace: &Path) -> PathBuf {
        if self.config.prefer_src_dir {
            let src = workspace.join(DEFAULT_SRC_DIR);
            if src.is_dir() {
                return src;
            }
        }
        workspace.to_path_buf()
    }

    /// Runs a full pass and publishes its outcome.
    ///
    /// Never leaves the tree in the discovering state: on failure an empty
    /// tree is published and the notifier is told why.
    pub async fn run(
        &self,
        root: &Path,
        sink: &mut (dyn EventSink + Send),
        notifier: &dyn Notifier,
    ) -> DiscoveryReport {
        sink.publish(Event::DiscoveryStarted);

        match self.discover(root).await {
            Ok(report) => {
                for warning in &report.warnings {
                    notifier.notify_error(&format!("discovery: {}", warning));
                }
                info!(
                    root = %root.display(),
                    suites = report.suites.len(),
                    cases = report.case_count(),
                    "discovery finished"
                );
                sink.publish(Event::Discovered(report.suites.clone()));
                report
            }
            Err(err) => {
                warn!(root = %root.display(), error = %err, "discovery failed");
                notifier.notify_error(&format!("discovery failed: {}", err));
                sink.publish(Event::Discovered(Vec::new()));
                DiscoveryReport {
                    error: Some(err),
                    ..Default::default()
                }
            }
        }
    }

    /// Builds the suite list without publishing anything.
    pub async fn discover(&self, root: &Path) -> Result<DiscoveryReport, DiscoveryError> {
        let metadata = tokio::fs::metadata(root).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                DiscoveryError::RootNotFound(root.to_path_buf())
            } else {
                DiscoveryError::io(root, e)
            }
        })?;
        if !metadata.is_dir() {
            return Err(DiscoveryError::RootNotFound(root.to_path_buf()));
        }

        let walk = walker::collect_test_files_async(
            root,
            &self.config.skip_folders,
            &self.config.test_file_suffix,
        )
        .await?;
        debug!(files = walk.files.len(), "test files found");

        // Every lookup runs concurrently; the pass resolves only when all have.
        let lookups = walk.files.iter().map(|file| self.build_suite(file));
        let built = join_all(lookups).await;

        let mut report = DiscoveryReport {
            warnings: walk.errors,
            ..Default::default()
        };
        for (suite, failure) in built {
            if let Some(err) = failure {
                report.warnings.push(err.into());
            }
            if self.config.drop_empty_suites && !suite.is_suite() {
                continue;
            }
            report.suites.push(suite);
        }

        Ok(report)
    }

    async fn build_suite(&self, file: &Path) -> (TestSuite, Option<LookupError>) {
        match self.provider.extract_symbols(file).await {
            Ok(symbols) => {
                let children = self
                    .filter
                    .select(symbols)
                    .into_iter()
                    .map(|s| TestCase::new(s.name, file).with_range(s.range))
                    .collect();
                (TestSuite::for_file(file, children), None)
            }
            Err(err) => {
                warn!(file = %file.display(), error = %err, "symbol lookup failed");
                (TestSuite::for_file(file, Vec::new()), Some(err))
            }
        }
    }
}
