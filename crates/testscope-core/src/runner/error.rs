use std::time::Duration;
use thiserror::Error;

/// Errors raised while dispatching a run to the external test runner.
///
/// The scheduler never propagates these; each one becomes a failed result.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error while running tests: {0}")]
    Io(#[from] std::io::Error),

    #[error("Test run timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("Test run aborted: {0}")]
    Aborted(String),
}
