#![forbid(unsafe_code)]

//! `vista-web` provides a host-driven simulation backend for Vista.
//!
//! Design goals:
//! - **Host-driven I/O**: tests (or an embedding JS shim) push scroll
//!   positions, input, frames and fetch completions explicitly.
//! - **Deterministic time**: the host advances a monotonic clock explicitly.
//! - **No blocking / no threads**: suitable for `wasm32-unknown-unknown`.
//!
//! The simulated page stacks panes vertically inside one scroll root and
//! records every programmatic scroll write and snap-mode change, so
//! choreography can be asserted frame by frame.

pub mod host;
pub mod loader;
pub mod page;

use core::time::Duration;

use vista_core::clock::Clock;

pub use host::{FRAME, SimulatedHost};
pub use loader::ScriptedLoader;
pub use page::{SimulatedPage, Transition, TransitionRecord};

/// Deterministic monotonic clock controlled by the host.
#[derive(Debug, Default, Clone)]
pub struct DeterministicClock {
    now: Duration,
}

impl DeterministicClock {
    /// Create a clock starting at `0`.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            now: Duration::ZERO,
        }
    }

    /// Set current monotonic time.
    pub fn set(&mut self, now: Duration) {
        self.now = now;
    }

    /// Advance monotonic time by `dt`.
    pub fn advance(&mut self, dt: Duration) {
        self.now = self.now.saturating_add(dt);
    }
}

impl Clock for DeterministicClock {
    fn now_mono(&self) -> Duration {
        self.now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_is_host_driven() {
        let mut clock = DeterministicClock::new();
        assert_eq!(clock.now_mono(), Duration::ZERO);
        clock.advance(Duration::from_millis(16));
        clock.advance(Duration::from_millis(16));
        assert_eq!(clock.now_mono(), Duration::from_millis(32));
        clock.set(Duration::from_secs(1));
        assert_eq!(clock.now_mono(), Duration::from_secs(1));
    }
}
