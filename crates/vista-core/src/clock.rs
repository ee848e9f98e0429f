#![forbid(unsafe_code)]

//! Monotonic time sources.
//!
//! Every controller takes `now` as a [`Duration`] since an arbitrary epoch
//! instead of reading the clock itself. Hosts pass [`SystemClock`] readings
//! in production and a deterministic clock in tests, so timing-dependent
//! behaviour replays exactly.

use std::time::Duration;

/// A monotonic clock.
pub trait Clock {
    /// Monotonic time since the clock's epoch.
    fn now_mono(&self) -> Duration;
}

/// Wall-clock backed monotonic time (works on `wasm32` through `web-time`).
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    epoch: web_time::Instant,
}

impl SystemClock {
    /// Start a clock whose epoch is now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            epoch: web_time::Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_mono(&self) -> Duration {
        self.epoch.elapsed()
    }
}
