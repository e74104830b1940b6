//! Progress reporting for a batch of period fetches.
//!
//! The scheduler reports one unit of progress per finished period through
//! [`ProgressCallback`]. Rendering (terminal bars, silence) is chosen by
//! the caller.

use std::sync::Arc;

/// Receives progress updates from [`crate::PeriodScheduler`].
///
/// Implementations must be `Send + Sync` so one instance can be shared
/// behind an `Arc`.
pub trait ProgressCallback: Send + Sync {
    /// Set the number of periods in the batch.
    fn set_total(&self, total: u64);

    /// Advance progress by `delta` finished periods.
    fn inc(&self, delta: u64);

    /// Update the message displayed alongside the progress indicator.
    fn set_message(&self, msg: String);

    /// Mark the batch as complete with a final message.
    fn finish(&self, msg: String);
}

/// A [`ProgressCallback`] that ignores every update.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
}

/// Returns a shared [`NullProgress`] instance.
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
