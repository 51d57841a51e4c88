//! Clock port for obtaining the current time and pausing execution.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Provides the current time and cooperative pauses.
///
/// Every sleep in the crate, from settle barriers between reconciliation
/// passes to rate-limit waits, 429 backoff, and the post-create pause, goes
/// through this trait so tests can substitute a fast-forward clock and
/// run a full cycle instantly.
pub trait Clock: Send + Sync {
    /// Returns the current UTC time.
    fn now(&self) -> DateTime<Utc>;

    /// Blocks the calling thread for `duration`.
    fn pause(&self, duration: Duration);
}
