//! Best-effort surface for user-visible problems.

use tracing::warn;

/// Receives messages meant for the user, e.g. "discovery failed: ...".
///
/// Implementations must not panic; the core never checks whether a
/// notification was delivered.
pub trait Notifier: Send + Sync {
    fn notify_error(&self, message: &str);
}

/// Forwards notifications to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify_error(&self, message: &str) {
        warn!(target: "testscope::notify", "{}", message);
    }
}
