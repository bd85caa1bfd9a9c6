//! `go test` adapter.
//!
//! Top-level functions are selected with `-run`. Receiver methods such as
//! `(*MathSuite).TestDiv` are not tests to `go test` on their own: they run
//! as subtests `TestOwner/TestDiv` of the suite function that calls
//! `suite.Run` for their receiver, narrowed with the suite method flag.
//! Output is read with `-v`, so a target that never produced `=== RUN` is
//! reported as failed rather than silently passing.

use async_trait::async_trait;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

use super::{RawRunOutput, RunConfig, RunnerError, TestRunner};
use crate::config::{RunnerConfig, DEFAULT_KILL_GRACE_SECS, DEFAULT_SUITE_METHOD_FLAG};

/// Matches `file.go:12:` prefixes in compiler and test output.
const FILE_LINE_PATTERN: &str = r"^\s*(.+\.go):(\d+):";

/// A top-level test function taking `*testing.T`.
const TEST_FUNC_PATTERN: &str = r"(?m)^func\s+(Test\w*)\s*\(\s*\w+\s+\*testing\.T\s*\)";

/// `suite.Run(t, new(X))` or `suite.Run(t, &X{})` inside a suite function.
const SUITE_RUN_PATTERN: &str = r"suite\.Run\(\s*\w+\s*,\s*(?:new\(\s*(\w+)\s*\)|&\s*(\w+)\s*\{)";

/// How one requested name is reached on the `go test` command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// A top-level test function.
    Function(String),
    /// A receiver method, run as `owner/method`.
    Method {
        label: String,
        owner: String,
        method: String,
    },
    /// A receiver method with no suite function to run it.
    Unreachable(String),
}

impl Selector {
    pub fn label(&self) -> &str {
        match self {
            Selector::Function(name) => name,
            Selector::Method { label, .. } => label,
            Selector::Unreachable(label) => label,
        }
    }

    /// The name `go test -v` reports in `=== RUN` and `--- FAIL:` lines.
    pub fn test_path(&self) -> Option<String> {
        match self {
            Selector::Function(name) => Some(name.clone()),
            Selector::Method { owner, method, .. } => Some(format!("{}/{}", owner, method)),
            Selector::Unreachable(_) => None,
        }
    }
}

/// Runs tests by spawning `go test` in the package directory.
#[derive(Debug, Clone)]
pub struct GoTestRunner {
    go_binary: String,
    build_tags: Option<String>,
    grace: Duration,
    suite_method_flag: Option<String>,
}

impl GoTestRunner {
    pub fn new(go_binary: impl Into<String>) -> Self {
        Self {
            go_binary: go_binary.into(),
            build_tags: None,
            grace: Duration::from_secs(DEFAULT_KILL_GRACE_SECS),
            suite_method_flag: Some(DEFAULT_SUITE_METHOD_FLAG.to_string()),
        }
    }

    pub fn from_config(config: &RunnerConfig) -> Self {
        Self {
            build_tags: config.build_tags.clone(),
            grace: Duration::from_secs(config.kill_grace_secs),
            suite_method_flag: config.suite_method_flag.clone(),
            ..Self::new(config.go_binary.clone())
        }
    }

    pub fn with_build_tags(mut self, tags: impl Into<String>) -> Self {
        self.build_tags = Some(tags.into());
        self
    }

    /// Time past the go timeout before the process is killed.
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    pub fn with_suite_method_flag(mut self, flag: Option<String>) -> Self {
        self.suite_method_flag = flag;
        self
    }

    /// Deadline for the whole process, `None` when go's timeout is disabled.
    pub fn kill_deadline(&self, timeout: Duration) -> Option<Duration> {
        (!timeout.is_zero()).then(|| timeout + self.grace)
    }

    /// Arguments for `go`, in order: test, timeout, -v, flags, tags, filters.
    pub fn build_args(&self, config: &RunConfig, selectors: &[Selector]) -> Vec<String> {
        let mut args = vec![
            "test".to_string(),
            "-timeout".to_string(),
            format!("{}s", config.timeout.as_secs()),
        ];
        if !selectors.is_empty() && !config.extra_flags.iter().any(|f| f == "-v") {
            args.push("-v".to_string());
        }
        args.extend(config.extra_flags.iter().cloned());

        if let Some(tags) = &self.build_tags {
            if !config.extra_flags.iter().any(|f| f == "-tags") {
                args.push("-tags".to_string());
                args.push(tags.clone());
            }
        }

        let mut functions: Vec<String> = Vec::new();
        let mut methods: Vec<String> = Vec::new();
        for selector in selectors {
            match selector {
                Selector::Function(name) => push_unique(&mut functions, name),
                Selector::Method { owner, method, .. } => {
                    push_unique(&mut functions, owner);
                    push_unique(&mut methods, method);
                }
                Selector::Unreachable(_) => {}
            }
        }

        if let Some(pattern) = run_pattern(&functions) {
            args.push("-run".to_string());
            args.push(pattern);
        }
        if let (Some(flag), Some(pattern)) = (&self.suite_method_flag, run_pattern(&methods)) {
            args.push(flag.clone());
            args.push(pattern);
        }

        args
    }

    /// Maps requested names to selectors, looking up suite functions in `dir`
    /// only when a receiver method was asked for.
    async fn selectors(&self, names: &[String], dir: &Path) -> Vec<Selector> {
        let wants_methods = names.iter().any(|n| method_label(n).is_some());
        let owners = match (&self.suite_method_flag, wants_methods) {
            (Some(_), true) => suite_owners(dir).await,
            _ => HashMap::new(),
        };
        names.iter().map(|name| select(name, &owners)).collect()
    }
}

#[async_trait]
impl TestRunner for GoTestRunner {
    async fn run(&self, config: RunConfig) -> Result<RawRunOutput, RunnerError> {
        let selectors = self.selectors(&config.target_names, &config.working_dir).await;
        if !selectors.is_empty() && selectors.iter().all(|s| s.test_path().is_none()) {
            let names: Vec<String> = selectors.iter().map(|s| s.label().to_string()).collect();
            let mut raw = RawRunOutput::failed(Vec::new(), Some(names.clone()));
            raw.error = Some(format!("no suite function runs {}", names.join(", ")));
            return Ok(raw);
        }

        let args = self.build_args(&config, &selectors);
        debug!(
            dir = %config.working_dir.display(),
            args = ?args,
            "spawning go test"
        );

        let child = Command::new(&self.go_binary)
            .args(&args)
            .current_dir(&config.working_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| RunnerError::Spawn {
                program: self.go_binary.clone(),
                source,
            })?;

        let output = match self.kill_deadline(config.timeout) {
            Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
                Ok(result) => result?,
                Err(_) => return Err(RunnerError::Timeout(limit)),
            },
            None => child.wait_with_output().await?,
        };

        let mut lines: Vec<String> = String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::to_string)
            .collect();
        // Build errors arrive on stderr with paths relative to the working dir.
        lines.extend(
            String::from_utf8_lossy(&output.stderr)
                .lines()
                .map(|line| expand_file_path(line, &config.working_dir)),
        );

        let mut raw = evaluate(&selectors, lines, output.status.success());
        if !output.status.success() && raw.error.is_none() {
            raw.error = Some(format!("go test exited with {}", output.status));
        }
        Ok(raw)
    }
}

/// Judges a finished run. With targets, every target must have run and not
/// failed; targets missing from the output are charged as failures.
pub fn evaluate(selectors: &[Selector], lines: Vec<String>, exit_ok: bool) -> RawRunOutput {
    if selectors.is_empty() {
        if exit_ok {
            return RawRunOutput::passed(lines);
        }
        let failing = failing_names(&lines);
        return RawRunOutput::failed(lines, (!failing.is_empty()).then_some(failing));
    }

    let ran = reported_names(&lines, "=== RUN");
    let failed = reported_names(&lines, "--- FAIL:");

    let mut failing = Vec::new();
    let mut missing = Vec::new();
    for selector in selectors {
        match selector.test_path() {
            Some(path) if failed.contains(&path) => failing.push(selector.label().to_string()),
            Some(path) if ran.contains(&path) => {}
            _ => missing.push(selector.label().to_string()),
        }
    }

    if exit_ok && failing.is_empty() && missing.is_empty() {
        return RawRunOutput::passed(lines);
    }

    let error = (!missing.is_empty()).then(|| format!("did not run: {}", missing.join(", ")));
    if let Some(error) = &error {
        warn!(error = %error, "requested tests missing from go test output");
    }
    failing.extend(missing);

    let mut raw = RawRunOutput::failed(lines, (!failing.is_empty()).then_some(failing));
    raw.error = error;
    raw
}

fn select(name: &str, owners: &HashMap<String, String>) -> Selector {
    match method_label(name) {
        None => Selector::Function(name.to_string()),
        Some((receiver, method)) => match owners.get(receiver) {
            Some(owner) => Selector::Method {
                label: name.to_string(),
                owner: owner.clone(),
                method: method.to_string(),
            },
            None => Selector::Unreachable(name.to_string()),
        },
    }
}

/// Splits `(*Recv).Method` into the bare receiver type and the method.
pub fn method_label(label: &str) -> Option<(&str, &str)> {
    let rest = label.strip_prefix('(')?;
    let (receiver, method) = rest.split_once(").")?;
    let receiver = receiver.trim_start_matches('*').trim();
    (!receiver.is_empty() && !method.is_empty()).then_some((receiver, method))
}

/// Receiver type → suite function, for the `_test.go` files in `dir`.
pub async fn suite_owners(dir: &Path) -> HashMap<String, String> {
    let mut owners = HashMap::new();
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(err) => {
            debug!(dir = %dir.display(), error = %err, "cannot list package for suite functions");
            return owners;
        }
    };

    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        if !path.to_string_lossy().ends_with("_test.go") {
            continue;
        }
        if let Ok(content) = tokio::fs::read_to_string(&path).await {
            for (receiver, owner) in scan_suite_functions(&content) {
                owners.entry(receiver).or_insert(owner);
            }
        }
    }
    owners
}

/// `(receiver type, suite function)` pairs found in one Go source file.
pub fn scan_suite_functions(content: &str) -> Vec<(String, String)> {
    let (Ok(funcs), Ok(runs)) = (Regex::new(TEST_FUNC_PATTERN), Regex::new(SUITE_RUN_PATTERN)) else {
        return Vec::new();
    };

    let starts: Vec<(usize, usize, String)> = funcs
        .captures_iter(content)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            Some((whole.start(), whole.end(), caps.get(1)?.as_str().to_string()))
        })
        .collect();

    let mut pairs = Vec::new();
    for (i, (_, body_start, owner)) in starts.iter().enumerate() {
        let body_end = starts.get(i + 1).map(|(s, _, _)| *s).unwrap_or(content.len());
        for caps in runs.captures_iter(&content[*body_start..body_end]) {
            if let Some(receiver) = caps.get(1).or_else(|| caps.get(2)) {
                pairs.push((receiver.as_str().to_string(), owner.clone()));
            }
        }
    }
    pairs
}

fn push_unique(list: &mut Vec<String>, name: &str) {
    if !list.iter().any(|n| n == name) {
        list.push(name.to_string());
    }
}

/// Names following `marker` in `-v` output, e.g. `=== RUN   TestA/sub`.
fn reported_names(lines: &[String], marker: &str) -> HashSet<String> {
    lines
        .iter()
        .filter_map(|line| line.trim_start().strip_prefix(marker))
        .filter_map(|rest| rest.split_whitespace().next())
        .map(str::to_string)
        .collect()
}

/// `-run` pattern that matches exactly the given names.
pub fn run_pattern(names: &[String]) -> Option<String> {
    if names.is_empty() {
        return None;
    }
    let alternatives: Vec<String> = names.iter().map(|n| regex::escape(n)).collect();
    Some(format!("^({})$", alternatives.join("|")))
}

/// Top-level test names from `--- FAIL: Name (0.00s)` lines, first occurrence order.
pub fn failing_names(lines: &[String]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for line in lines {
        let Some(rest) = line.trim_start().strip_prefix("--- FAIL: ") else {
            continue;
        };
        let Some(full) = rest.split_whitespace().next() else {
            continue;
        };
        let top = full.split('/').next().unwrap_or(full).to_string();
        if !names.contains(&top) {
            names.push(top);
        }
    }
    names
}

/// Rewrites a relative `file.go:N:` prefix to an absolute path under `cwd`.
pub fn expand_file_path(line: &str, cwd: &Path) -> String {
    let re = match Regex::new(FILE_LINE_PATTERN) {
        Ok(r) => r,
        Err(_) => return line.to_string(),
    };

    match re.captures(line).and_then(|caps| caps.get(1)) {
        Some(file) if !Path::new(file.as_str()).is_absolute() => {
            let absolute = cwd.join(file.as_str());
            format!(
                "{}{}{}",
                &line[..file.start()],
                absolute.display(),
                &line[file.end()..]
            )
        }
        _ => line.to_string(),
    }
}
