//! Session facade tying discovery, scheduling and the state store together.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::config::{Config, ConfigError};
use crate::discovery::{DiscoveryEngine, DiscoveryReport, GoSymbolProvider, SymbolProvider};
use crate::events::{EventBus, Observer, Projector, SubscriptionId};
use crate::model::{NodeKey, Status};
use crate::notify::{LogNotifier, Notifier};
use crate::runner::{GoTestRunner, TestRunner};
use crate::scheduler::{RequestId, RequestState, RunRequest, RunScheduler, SchedulerSettings};
use crate::store::StateStore;

/// Owns the test tree for one workspace and everything that changes it.
///
/// All store mutation goes through this value, so callers drive it from a
/// single task. Runner processes execute concurrently in the background;
/// their results are applied when [`Explorer::next_completion`] or
/// [`Explorer::wait_idle`] is awaited.
pub struct Explorer {
    workspace: PathBuf,
    store: StateStore,
    bus: EventBus,
    discovery: DiscoveryEngine,
    scheduler: RunScheduler,
    notifier: Arc<dyn Notifier>,
}

impl Explorer {
    pub fn new(
        workspace: impl Into<PathBuf>,
        config: Config,
        provider: Arc<dyn SymbolProvider>,
        runner: Arc<dyn TestRunner>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let settings = SchedulerSettings::from_config(&config.runner);

        Ok(Self {
            workspace: workspace.into(),
            store: StateStore::new(),
            bus: EventBus::new(),
            discovery: DiscoveryEngine::new(config.discovery, provider)?,
            scheduler: RunScheduler::new(runner, settings),
            notifier,
        })
    }

    /// Explorer backed by tree-sitter symbol extraction and `go test`.
    pub fn with_go_tooling(workspace: impl Into<PathBuf>, config: Config) -> Result<Self, ConfigError> {
        let runner = GoTestRunner::from_config(&config.runner);
        Self::new(
            workspace,
            config,
            Arc::new(GoSymbolProvider::new()),
            Arc::new(runner),
            Arc::new(LogNotifier),
        )
    }

    /// Replaces the notifier, e.g. with one that writes to the terminal.
    pub fn set_notifier(&mut self, notifier: Arc<dyn Notifier>) {
        self.notifier = notifier;
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn subscribe(&mut self, observer: impl Observer + 'static) -> SubscriptionId {
        self.bus.subscribe(observer)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }

    /// Rebuilds the whole tree from disk.
    pub async fn refresh(&mut self) -> DiscoveryReport {
        let root = self.discovery.resolve_root(&self.workspace);
        let mut sink = Projector::new(&mut self.store, &mut self.bus);
        self.discovery
            .run(&root, &mut sink, self.notifier.as_ref())
            .await
    }

    /// Rediscovers when a test file was saved; other files are ignored.
    pub async fn on_file_saved(&mut self, path: &Path) -> Option<DiscoveryReport> {
        if !self.discovery.config().is_test_file(path) {
            debug!(file = %path.display(), "saved file is not a test file");
            return None;
        }
        Some(self.refresh().await)
    }

    /// Runs one test function. `None` if it is not in the current tree.
    pub fn run_case(&mut self, location: &Path, name: &str) -> Option<RequestId> {
        let request = RunRequest::for_case(self.store.find_case(location, name)?);
        self.submit(request)
    }

    /// Runs every test in a file. `None` if the file is unknown or has no tests.
    pub fn run_suite(&mut self, location: &Path) -> Option<RequestId> {
        let request = RunRequest::suite(self.store.find_suite(location)?);
        self.submit(request)
    }

    /// Runs every suite in the tree.
    pub fn run_all(&mut self) -> Vec<RequestId> {
        let requests: Vec<RunRequest> = self
            .store
            .suites()
            .iter()
            .filter(|s| s.is_suite())
            .map(RunRequest::suite)
            .collect();
        let mut sink = Projector::new(&mut self.store, &mut self.bus);
        self.scheduler.submit_all(requests, &mut sink)
    }

    /// Submits an arbitrary request, e.g. for a node that was rediscovered since.
    pub fn submit(&mut self, request: RunRequest) -> Option<RequestId> {
        let mut sink = Projector::new(&mut self.store, &mut self.bus);
        self.scheduler.submit(request, &mut sink)
    }

    /// Applies the next finished run. `None` when nothing is running.
    pub async fn next_completion(&mut self) -> Option<RequestId> {
        let mut sink = Projector::new(&mut self.store, &mut self.bus);
        self.scheduler.next_completion(&mut sink).await
    }

    /// Applies completions until every submitted run has finished.
    pub async fn wait_idle(&mut self) -> usize {
        let mut sink = Projector::new(&mut self.store, &mut self.bus);
        self.scheduler.drain(&mut sink).await
    }

    pub fn request_state(&self, id: RequestId) -> Option<RequestState> {
        self.scheduler.state(id)
    }

    pub fn running_count(&self) -> usize {
        self.scheduler.running_count()
    }

    pub fn queued_count(&self) -> usize {
        self.scheduler.queued_count()
    }

    pub fn is_idle(&self) -> bool {
        self.scheduler.is_idle()
    }

    pub fn status_of(&self, key: &NodeKey) -> Option<Status> {
        self.store.status(key)
    }
}
