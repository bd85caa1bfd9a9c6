//! Bounded-concurrency run scheduling.
//!
//! Requests move `Queued -> Running -> Completed`. At most `max_parallel`
//! are running at once; the rest wait in FIFO order. There is no background
//! poller: a slot is refilled when a completion is processed in
//! [`RunScheduler::next_completion`]. Runner failures become failed results
//! and never stop the queue.

mod fanout;

pub use fanout::fan_out;

use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::{RunnerConfig, UnattributedFailure};
use crate::events::{Event, EventSink};
use crate::model::{NodeKey, TestCase, TestSuite};
use crate::runner::{RawRunOutput, RunConfig, RunnerError, TestRunner};

/// Identifies a submitted request. Allocated by the scheduler, never reused.
pub type RequestId = u64;

/// What a request runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunTarget {
    /// A single test function.
    Case(NodeKey),
    /// Every listed case of a suite, then the suite as a unit.
    Suite { key: NodeKey, cases: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRequest {
    pub target: RunTarget,
}

impl RunRequest {
    pub fn case(key: NodeKey) -> Self {
        Self {
            target: RunTarget::Case(key),
        }
    }

    pub fn for_case(case: &TestCase) -> Self {
        Self::case(case.key())
    }

    /// Snapshot of the suite's current children.
    pub fn suite(suite: &TestSuite) -> Self {
        Self {
            target: RunTarget::Suite {
                key: suite.key(),
                cases: suite.children.iter().map(|c| c.name.clone()).collect(),
            },
        }
    }

    /// A suite request with no cases has nothing to run.
    pub fn is_empty(&self) -> bool {
        matches!(&self.target, RunTarget::Suite { cases, .. } if cases.is_empty())
    }

    pub fn key(&self) -> &NodeKey {
        match &self.target {
            RunTarget::Case(key) => key,
            RunTarget::Suite { key, .. } => key,
        }
    }

    /// Every node that enters the loading state for this request.
    fn loading_keys(&self) -> Vec<NodeKey> {
        match &self.target {
            RunTarget::Case(key) => vec![key.clone()],
            RunTarget::Suite { key, cases } => std::iter::once(key.clone())
                .chain(cases.iter().map(|c| NodeKey::new(&key.location, c)))
                .collect(),
        }
    }

    fn target_names(&self) -> Vec<String> {
        match &self.target {
            RunTarget::Case(key) => vec![key.name.clone()],
            RunTarget::Suite { cases, .. } => cases.clone(),
        }
    }

    fn working_dir(&self) -> PathBuf {
        let location = &self.key().location;
        location
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| location.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestState {
    Queued,
    Running,
    Completed,
}

/// Scheduler knobs, usually taken from [`RunnerConfig`].
#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub max_parallel: usize,
    pub timeout: Duration,
    pub extra_flags: Vec<String>,
    pub unattributed_failure: UnattributedFailure,
}

impl SchedulerSettings {
    pub fn from_config(config: &RunnerConfig) -> Self {
        Self {
            max_parallel: config.max_parallel.max(1),
            timeout: Duration::from_secs(config.test_timeout_secs),
            extra_flags: config.flags.clone(),
            unattributed_failure: config.unattributed_failure,
        }
    }
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self::from_config(&RunnerConfig::default())
    }
}

struct Completion {
    id: RequestId,
    request: RunRequest,
    outcome: Result<RawRunOutput, RunnerError>,
}

pub struct RunScheduler {
    runner: Arc<dyn TestRunner>,
    settings: SchedulerSettings,
    queue: VecDeque<(RequestId, RunRequest)>,
    running: FuturesUnordered<BoxFuture<'static, Completion>>,
    states: HashMap<RequestId, RequestState>,
    next_id: RequestId,
}

impl RunScheduler {
    pub fn new(runner: Arc<dyn TestRunner>, settings: SchedulerSettings) -> Self {
        Self {
            runner,
            settings,
            queue: VecDeque::new(),
            running: FuturesUnordered::new(),
            states: HashMap::new(),
            next_id: 0,
        }
    }

    pub fn settings(&self) -> &SchedulerSettings {
        &self.settings
    }

    /// Queues a request and marks its nodes as loading.
    ///
    /// The loading events are published before anything is started. Returns
    /// `None`, publishing nothing, for a suite request without cases.
    pub fn submit(&mut self, request: RunRequest, sink: &mut (dyn EventSink + Send)) -> Option<RequestId> {
        if request.is_empty() {
            debug!(node = %request.key(), "ignoring run of empty suite");
            return None;
        }

        for key in request.loading_keys() {
            sink.publish(Event::RunStarted(Some(key)));
        }

        let id = self.enqueue(request);
        self.pump();
        Some(id)
    }

    /// Queues several requests behind a single "everything is loading" event.
    ///
    /// Empty requests are dropped; if none remain nothing is published.
    pub fn submit_all(
        &mut self,
        requests: Vec<RunRequest>,
        sink: &mut (dyn EventSink + Send),
    ) -> Vec<RequestId> {
        let requests: Vec<RunRequest> = requests.into_iter().filter(|r| !r.is_empty()).collect();
        if requests.is_empty() {
            return Vec::new();
        }

        sink.publish(Event::RunStarted(None));

        let ids = requests.into_iter().map(|r| self.enqueue(r)).collect();
        self.pump();
        ids
    }

    /// Waits for the next in-flight request, publishes its results and
    /// starts the next queued request if a slot is free.
    ///
    /// Returns `None` when nothing is running.
    pub async fn next_completion(&mut self, sink: &mut (dyn EventSink + Send)) -> Option<RequestId> {
        let Completion { id, request, outcome } = self.running.next().await?;
        // Finished requests are not tracked; `state` infers them from the id.
        self.states.remove(&id);

        if let Err(err) = &outcome {
            info!(request = id, node = %request.key(), error = %err, "run dispatch failed");
        }

        let results = fan_out(&request, outcome, self.settings.unattributed_failure);
        let passed = results.iter().all(|r| r.passed);
        for result in results {
            sink.publish(Event::Result(result));
        }
        sink.publish(Event::RunCompleted { request: id, passed });

        self.pump();
        Some(id)
    }

    /// Processes completions until nothing is running or queued.
    pub async fn drain(&mut self, sink: &mut (dyn EventSink + Send)) -> usize {
        let mut completed = 0;
        while self.next_completion(sink).await.is_some() {
            completed += 1;
        }
        completed
    }

    /// `None` only for ids this scheduler never issued.
    pub fn state(&self, id: RequestId) -> Option<RequestState> {
        match self.states.get(&id) {
            Some(state) => Some(*state),
            None if id < self.next_id => Some(RequestState::Completed),
            None => None,
        }
    }

    pub fn running_count(&self) -> usize {
        self.running.len()
    }

    pub fn queued_count(&self) -> usize {
        self.queue.len()
    }

    pub fn is_idle(&self) -> bool {
        self.running.is_empty() && self.queue.is_empty()
    }

    fn enqueue(&mut self, request: RunRequest) -> RequestId {
        let id = self.next_id;
        self.next_id += 1;
        self.states.insert(id, RequestState::Queued);
        self.queue.push_back((id, request));
        id
    }

    /// Starts queued requests while capacity allows.
    fn pump(&mut self) {
        while self.running.len() < self.settings.max_parallel {
            let Some((id, request)) = self.queue.pop_front() else {
                break;
            };
            self.start(id, request);
        }
    }

    fn start(&mut self, id: RequestId, request: RunRequest) {
        self.states.insert(id, RequestState::Running);
        debug!(
            request = id,
            node = %request.key(),
            running = self.running.len() + 1,
            queued = self.queue.len(),
            "starting run"
        );

        let config = RunConfig {
            working_dir: request.working_dir(),
            target_names: request.target_names(),
            timeout: self.settings.timeout,
            extra_flags: self.settings.extra_flags.clone(),
        };
        let runner = Arc::clone(&self.runner);
        let handle = tokio::spawn(async move { runner.run(config).await });

        self.running.push(
            async move {
                let outcome = match handle.await {
                    Ok(outcome) => outcome,
                    Err(join_err) => Err(RunnerError::Aborted(join_err.to_string())),
                };
                Completion { id, request, outcome }
            }
            .boxed(),
        );
    }
}
