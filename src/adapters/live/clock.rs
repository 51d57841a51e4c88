//! Live clock using the system clock and real sleeps.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::ports::Clock;

/// Live clock: real time, real blocking sleeps.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn pause(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
