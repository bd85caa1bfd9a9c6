//! Canonical test tree plus a flat index for targeted updates.
//!
//! The store is only ever mutated through [`StateStore::apply`], from the
//! single task that drives the [`Explorer`](crate::Explorer). Suite status is
//! not cached; it is derived from the children whenever it is read.

use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

use crate::events::Event;
use crate::model::{NodeKey, NodeRef, RunResult, Status, StatusSummary, TestCase, TestSuite};

#[derive(Debug, Clone, Copy)]
enum Slot {
    Suite(usize),
    Case(usize, usize),
}

/// What a tree consumer should render.
#[derive(Debug, Clone, Copy)]
pub enum TreeView<'a> {
    /// Discovery is running or has never completed.
    Loading,
    Ready(&'a [TestSuite]),
}

#[derive(Debug, Default)]
pub struct StateStore {
    suites: Vec<TestSuite>,
    index: HashMap<NodeKey, Slot>,
    discovering: bool,
    discovered: bool,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one event. Events that name a node missing from the index are ignored.
    pub fn apply(&mut self, event: &Event) {
        match event {
            Event::DiscoveryStarted => self.on_discovery_started(),
            Event::Discovered(suites) => self.on_discovered(suites.clone()),
            Event::RunStarted(target) => {
                self.on_run_started(target.as_ref());
            }
            Event::Result(result) => {
                self.on_result(result.clone());
            }
            Event::RunCompleted { .. } => {}
        }
    }

    pub fn on_discovery_started(&mut self) {
        self.suites.clear();
        self.index.clear();
        self.discovering = true;
    }

    pub fn on_discovered(&mut self, suites: Vec<TestSuite>) {
        self.suites = suites;
        self.rebuild_index();
        self.discovering = false;
        self.discovered = true;
    }

    /// Marks a node (or every case, for `None`) as loading.
    ///
    /// Returns false when the named node is not in the current tree.
    pub fn on_run_started(&mut self, target: Option<&NodeKey>) -> bool {
        let Some(key) = target else {
            for case in self.suites.iter_mut().flat_map(|s| s.children.iter_mut()) {
                case.set_loading();
            }
            return true;
        };

        match self.index.get(key).copied() {
            Some(Slot::Suite(s)) => self.suites[s].set_loading(),
            Some(Slot::Case(s, c)) => self.suites[s].children[c].set_loading(),
            None => {
                debug!(node = %key, "run started for unknown node");
                return false;
            }
        }
        true
    }

    /// Attaches a result to its node, ending that node's loading state.
    ///
    /// Returns false when the node is not in the current tree.
    pub fn on_result(&mut self, result: RunResult) -> bool {
        let key = result.key();
        match self.index.get(&key).copied() {
            Some(Slot::Suite(s)) => self.suites[s].attach_result(result),
            Some(Slot::Case(s, c)) => self.suites[s].children[c].attach_result(result),
            None => {
                debug!(node = %key, "result for unknown node dropped");
                return false;
            }
        }
        true
    }

    pub fn is_discovering(&self) -> bool {
        self.discovering
    }

    pub fn tree(&self) -> TreeView<'_> {
        if self.discovering || !self.discovered {
            TreeView::Loading
        } else {
            TreeView::Ready(&self.suites)
        }
    }

    pub fn suites(&self) -> &[TestSuite] {
        &self.suites
    }

    pub fn node(&self, key: &NodeKey) -> Option<NodeRef<'_>> {
        match self.index.get(key)? {
            Slot::Suite(s) => Some(NodeRef::Suite(&self.suites[*s])),
            Slot::Case(s, c) => Some(NodeRef::Case(&self.suites[*s].children[*c])),
        }
    }

    pub fn status(&self, key: &NodeKey) -> Option<Status> {
        self.node(key).map(|n| n.status())
    }

    pub fn find_suite(&self, location: &Path) -> Option<&TestSuite> {
        self.suites.iter().find(|s| s.location == location)
    }

    pub fn find_case(&self, location: &Path, name: &str) -> Option<&TestCase> {
        match self.node(&NodeKey::new(location, name))? {
            NodeRef::Case(case) => Some(case),
            NodeRef::Suite(_) => None,
        }
    }

    /// Counts every case by status.
    pub fn summary(&self) -> StatusSummary {
        let mut summary = StatusSummary::default();
        for case in self.suites.iter().flat_map(|s| s.children.iter()) {
            summary.record(case.status());
        }
        summary
    }

    fn rebuild_index(&mut self) {
        self.index.clear();
        for (s, suite) in self.suites.iter().enumerate() {
            self.index.insert(suite.key(), Slot::Suite(s));
            for (c, case) in suite.children.iter().enumerate() {
                self.index.insert(case.key(), Slot::Case(s, c));
            }
        }
    }
}
