use serde::{Deserialize, Serialize};
use std::fmt;

use super::result::RunResult;

/// Display state of a node, derived on every read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    /// A run has been submitted and no result has arrived yet.
    Loading,
    /// Never run.
    Unknown,
    Passed,
    Failed,
}

impl Status {
    pub(crate) fn of_leaf(loading: bool, result: Option<&RunResult>) -> Self {
        if loading {
            return Status::Loading;
        }
        match result {
            None => Status::Unknown,
            Some(r) if r.passed => Status::Passed,
            Some(_) => Status::Failed,
        }
    }

    /// Folds child statuses into a suite status.
    ///
    /// Precedence: any `Loading`, then any `Unknown`, then any `Failed`,
    /// otherwise `Passed`.
    pub fn aggregate(children: impl IntoIterator<Item = Status>) -> Self {
        let mut unknown = false;
        let mut failed = false;

        for status in children {
            match status {
                Status::Loading => return Status::Loading,
                Status::Unknown => unknown = true,
                Status::Failed => failed = true,
                Status::Passed => {}
            }
        }

        if unknown {
            Status::Unknown
        } else if failed {
            Status::Failed
        } else {
            Status::Passed
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Status::Loading => "Loading",
            Status::Unknown => "Unknown",
            Status::Passed => "Passed",
            Status::Failed => "Failed",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Case counts per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSummary {
    pub loading: usize,
    pub unknown: usize,
    pub passed: usize,
    pub failed: usize,
}

impl StatusSummary {
    pub fn record(&mut self, status: Status) {
        match status {
            Status::Loading => self.loading += 1,
            Status::Unknown => self.unknown += 1,
            Status::Passed => self.passed += 1,
            Status::Failed => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.loading + self.unknown + self.passed + self.failed
    }
}
