//! Cooperative rolling-window call limiter.
//!
//! Admits at most `max_calls` within any rolling window. Callers over the
//! limit block until the window has room; nothing is ever rejected. This
//! is a throttle for a single sequential caller, not a fair queue.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use crate::ports::Clock;

/// Rolling-window limiter with a blocking "wait until admit" operation.
pub struct RollingWindow {
    max_calls: usize,
    window: TimeDelta,
    clock: Arc<dyn Clock>,
    admitted: Mutex<VecDeque<DateTime<Utc>>>,
}

impl RollingWindow {
    /// Creates a limiter admitting `max_calls` per `window`.
    #[must_use]
    pub fn new(max_calls: usize, window: TimeDelta, clock: Arc<dyn Clock>) -> Self {
        Self { max_calls, window, clock, admitted: Mutex::new(VecDeque::new()) }
    }

    /// Blocks until the window admits one more call, then records it.
    ///
    /// The wait runs through the injected [`Clock`], so a fast-forward
    /// clock makes this instantaneous in tests.
    pub fn admit(&self) {
        loop {
            let now = self.clock.now();
            let mut admitted =
                self.admitted.lock().unwrap_or_else(PoisonError::into_inner);
            while admitted.front().is_some_and(|stamp| now - *stamp >= self.window) {
                admitted.pop_front();
            }
            if admitted.len() < self.max_calls {
                admitted.push_back(now);
                return;
            }
            // Oldest admission leaving the window is the earliest time a
            // slot frees up.
            let Some(oldest) = admitted.front().copied() else { return };
            drop(admitted);
            let wait = (oldest + self.window - now).to_std().unwrap_or(Duration::ZERO);
            self.clock.pause(wait);
        }
    }
}
