pub mod config;
pub mod discovery;
pub mod events;
pub mod explorer;
pub mod model;
pub mod notify;
pub mod runner;
pub mod scheduler;
pub mod store;

pub use config::{Config, ConfigError, DiscoveryConfig, RunnerConfig, UnattributedFailure};
pub use discovery::{DiscoveryEngine, DiscoveryError, DiscoveryReport, LookupError, SymbolProvider};
pub use events::{Event, EventBus, EventSink, Observer, Projector, SubscriptionId};
pub use explorer::Explorer;
pub use model::{NodeKey, NodeRef, RunResult, Status, StatusSummary, TestCase, TestSuite};
pub use notify::{LogNotifier, Notifier};
pub use runner::{RawRunOutput, RunConfig, RunnerError, TestRunner};
pub use scheduler::{RequestId, RequestState, RunRequest, RunScheduler, RunTarget, SchedulerSettings};
pub use store::{StateStore, TreeView};
