#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::Semaphore;

use testscope_core::discovery::{Symbol, SymbolKind};
use testscope_core::model::SourceRange;
use testscope_core::{
    Config, Explorer, LookupError, Notifier, RawRunOutput, RunConfig, RunnerError, SymbolProvider,
    TestRunner,
};

/// Writes `files` (relative paths) under a fresh temp dir.
pub fn workspace(files: &[&str]) -> TempDir {
    let temp = TempDir::new().unwrap();
    for rel in files {
        let path = temp.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "package x\n").unwrap();
    }
    temp
}

fn symbol(name: &str) -> Symbol {
    Symbol {
        name: name.to_string(),
        kind: SymbolKind::Function,
        range: SourceRange {
            start_line: 1,
            end_line: 1,
        },
    }
}

/// Symbol provider answering from a table keyed by file base name.
#[derive(Default)]
pub struct TableProvider {
    table: Mutex<HashMap<String, Vec<String>>>,
    failing: Mutex<Vec<String>>,
}

impl TableProvider {
    pub fn new(entries: &[(&str, &[&str])]) -> Arc<Self> {
        let provider = Self::default();
        for (file, names) in entries {
            provider.set(file, names);
        }
        Arc::new(provider)
    }

    pub fn set(&self, file: &str, names: &[&str]) {
        self.table.lock().unwrap().insert(
            file.to_string(),
            names.iter().map(|n| n.to_string()).collect(),
        );
    }

    pub fn fail(&self, file: &str) {
        self.failing.lock().unwrap().push(file.to_string());
    }
}

#[async_trait]
impl SymbolProvider for TableProvider {
    async fn extract_symbols(&self, file: &Path) -> Result<Vec<Symbol>, LookupError> {
        let name = file.file_name().unwrap().to_string_lossy().to_string();
        if self.failing.lock().unwrap().contains(&name) {
            return Err(LookupError::parse(file, "syntax error"));
        }
        Ok(self
            .table
            .lock()
            .unwrap()
            .get(&name)
            .map(|names| names.iter().map(|n| symbol(n)).collect())
            .unwrap_or_default())
    }
}

/// Runner that answers every call with `respond`, optionally waiting on a gate.
pub struct FakeRunner {
    respond: Box<dyn Fn(&RunConfig) -> Result<RawRunOutput, RunnerError> + Send + Sync>,
    gate: Option<Arc<Semaphore>>,
    pub calls: AtomicUsize,
    pub current: AtomicUsize,
    pub peak: AtomicUsize,
    pub seen: Mutex<Vec<RunConfig>>,
}

impl FakeRunner {
    pub fn new(
        respond: impl Fn(&RunConfig) -> Result<RawRunOutput, RunnerError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            respond: Box::new(respond),
            gate: None,
            calls: AtomicUsize::new(0),
            current: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn passing() -> Self {
        Self::new(|_| Ok(RawRunOutput::passed(vec!["ok".to_string()])))
    }

    /// Every call blocks until a permit is added to `gate`.
    pub fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }
}

#[async_trait]
impl TestRunner for FakeRunner {
    async fn run(&self, config: RunConfig) -> Result<RawRunOutput, RunnerError> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(config.clone());

        match &self.gate {
            Some(gate) => gate.acquire().await.unwrap().forget(),
            None => tokio::time::sleep(Duration::from_millis(2)).await,
        }

        self.current.fetch_sub(1, Ordering::SeqCst);
        (self.respond)(&config)
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub messages: Mutex<Vec<String>>,
}

impl Notifier for RecordingNotifier {
    fn notify_error(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}

pub fn config_with_parallel(max_parallel: usize) -> Config {
    let mut config = Config::default();
    config.runner.max_parallel = max_parallel;
    config
}

pub fn explorer(
    root: &Path,
    provider: Arc<TableProvider>,
    runner: Arc<FakeRunner>,
    config: Config,
) -> (Explorer, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::default());
    let explorer = Explorer::new(root, config, provider, runner, notifier.clone()).unwrap();
    (explorer, notifier)
}

pub fn file(root: &Path, rel: &str) -> PathBuf {
    root.join(rel)
}
