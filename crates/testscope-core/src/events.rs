//! Typed publish/subscribe between discovery, scheduling and the state store.
//!
//! Delivery is synchronous and ordered: the [`StateStore`] applies every event
//! first, then observers see it in subscription order with read access to the
//! already-updated store. A loading event published before a run starts is
//! therefore always visible before that run's result.

use tracing::debug;

use crate::model::{NodeKey, RunResult, TestSuite};
use crate::scheduler::RequestId;
use crate::store::StateStore;

/// Everything that can change the tree.
#[derive(Debug, Clone)]
pub enum Event {
    /// A discovery pass began; the tree is cleared.
    DiscoveryStarted,
    /// A discovery pass finished; the tree is replaced wholesale.
    Discovered(Vec<TestSuite>),
    /// A node was submitted for running. `None` means every case.
    RunStarted(Option<NodeKey>),
    /// A run result for one node.
    Result(RunResult),
    /// A scheduled request finished and its results have been published.
    RunCompleted { request: RequestId, passed: bool },
}

impl Event {
    pub fn kind(&self) -> &'static str {
        match self {
            Event::DiscoveryStarted => "discovery_started",
            Event::Discovered(_) => "discovered",
            Event::RunStarted(_) => "run_started",
            Event::Result(_) => "result",
            Event::RunCompleted { .. } => "run_completed",
        }
    }
}

/// Anything events can be published into.
pub trait EventSink {
    fn publish(&mut self, event: Event);
}

/// Records events without applying them.
impl EventSink for Vec<Event> {
    fn publish(&mut self, event: Event) {
        self.push(event);
    }
}

/// Receives every event after the store has applied it.
pub trait Observer: Send {
    fn on_event(&mut self, event: &Event, store: &StateStore);
}

impl<F> Observer for F
where
    F: FnMut(&Event, &StateStore) + Send,
{
    fn on_event(&mut self, event: &Event, store: &StateStore) {
        self(event, store)
    }
}

/// Handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Observer registry with in-order delivery.
#[derive(Default)]
pub struct EventBus {
    observers: Vec<(SubscriptionId, Box<dyn Observer>)>,
    next_id: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, observer: impl Observer + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// Returns false if the subscription was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(sub, _)| *sub != id);
        self.observers.len() != before
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    fn notify(&mut self, event: &Event, store: &StateStore) {
        for (_, observer) in &mut self.observers {
            observer.on_event(event, store);
        }
    }
}

/// Sink that projects events onto the store and then fans them out to observers.
pub struct Projector<'a> {
    store: &'a mut StateStore,
    bus: &'a mut EventBus,
}

impl<'a> Projector<'a> {
    pub fn new(store: &'a mut StateStore, bus: &'a mut EventBus) -> Self {
        Self { store, bus }
    }
}

impl EventSink for Projector<'_> {
    fn publish(&mut self, event: Event) {
        debug!(event = event.kind(), "publishing");
        self.store.apply(&event);
        self.bus.notify(&event, self.store);
    }
}
