//! External test runner contract.
//!
//! The scheduler treats a run as one opaque async call: it hands over a
//! [`RunConfig`] and gets back a [`RawRunOutput`] describing the whole
//! invocation. Mapping that onto individual cases happens in the scheduler.

mod error;
mod go;

pub use error::RunnerError;
pub use go::GoTestRunner;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Input for one runner invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Directory the runner executes in (the package directory).
    pub working_dir: PathBuf,
    /// Test functions to run. Empty means every test in the package.
    pub target_names: Vec<String>,
    pub timeout: Duration,
    pub extra_flags: Vec<String>,
}

/// What the runner reported for one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRunOutput {
    pub passed: bool,
    pub output: Vec<String>,
    /// Tests the runner reported as failing, when it could tell.
    pub failing_names: Option<Vec<String>>,
    pub error: Option<String>,
}

impl RawRunOutput {
    pub fn passed(output: Vec<String>) -> Self {
        Self {
            passed: true,
            output,
            ..Default::default()
        }
    }

    pub fn failed(output: Vec<String>, failing_names: Option<Vec<String>>) -> Self {
        Self {
            passed: false,
            output,
            failing_names,
            error: None,
        }
    }

    /// Failing names, or `None` when the failure is not attributed to any test.
    pub fn attributed_failures(&self) -> Option<&[String]> {
        self.failing_names
            .as_deref()
            .filter(|names| !names.is_empty())
    }
}

/// Executes tests.
#[async_trait]
pub trait TestRunner: Send + Sync {
    async fn run(&self, config: RunConfig) -> Result<RawRunOutput, RunnerError>;
}
