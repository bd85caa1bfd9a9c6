use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::node::NodeKey;

/// Outcome of one run attempt for one node.
///
/// Produced once and never mutated; a new run produces a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// Location of the node the result belongs to.
    pub location: PathBuf,
    /// Name of the node the result belongs to.
    pub name: String,
    pub passed: bool,
    /// Captured runner output, in order.
    pub output: Vec<String>,
    /// Failure diagnostic, e.g. the runner could not be started.
    pub error: Option<String>,
    pub finished_at: DateTime<Utc>,
}

impl RunResult {
    pub fn new(target: &NodeKey, passed: bool, output: Vec<String>, error: Option<String>) -> Self {
        Self {
            location: target.location.clone(),
            name: target.name.clone(),
            passed,
            output,
            error,
            finished_at: Utc::now(),
        }
    }

    pub fn key(&self) -> NodeKey {
        NodeKey::new(&self.location, &self.name)
    }
}
