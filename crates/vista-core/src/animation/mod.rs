#![forbid(unsafe_code)]

//! Animation primitives: easing curves and animation-item handles.
//!
//! An [`AnimationItem`] is a handle to something that animates a single
//! scalar (opacity, scroll progress, a rig's playhead) over a normalized
//! range. Controllers talk to items only through this capability set, so the
//! same controller drives a real fade ([`Fade`]) or a headless /
//! reduced-motion stand-in ([`Immediate`]).
//!
//! # Invariants
//!
//! 1. `value()` is always the last written position; it never jumps unless
//!    `seek` or a tick moves it.
//! 2. A completion callback fires at most once, and only for the range that
//!    was playing when it was registered.
//! 3. After `dispose()`, every method is a no-op and pending callbacks are
//!    dropped without firing.
//!
//! # Failure Modes
//!
//! - Zero-duration ranges complete on the next tick (or immediately for
//!   [`Immediate`]).
//! - Non-finite positions are clamped to 0.0.

mod fade;

pub use fade::{Fade, Immediate};

use std::time::Duration;

// ---------------------------------------------------------------------------
// Easing
// ---------------------------------------------------------------------------

/// Easing curve applied to normalized progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Easing {
    /// Linear interpolation.
    Linear,
    /// Cubic ease-out (decelerating). Used for scroll hand-offs and entrances.
    #[default]
    EaseOutCubic,
    /// Cubic ease-in (accelerating). Used for exits.
    EaseInCubic,
    /// Cubic S-curve.
    EaseInOutCubic,
}

impl Easing {
    /// Apply the easing function to a progress value (clamped to 0.0–1.0).
    #[must_use]
    pub fn apply(self, t: f64) -> f64 {
        let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
        match self {
            Self::Linear => t,
            Self::EaseOutCubic => {
                let inv = 1.0 - t;
                1.0 - inv * inv * inv
            }
            Self::EaseInCubic => t * t * t,
            Self::EaseInOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    let inv = -2.0 * t + 2.0;
                    1.0 - inv * inv * inv / 2.0
                }
            }
        }
    }
}

/// Cubic ease-out, as a free function for call sites that want a plain `fn`.
#[inline]
#[must_use]
pub fn ease_out_cubic(t: f64) -> f64 {
    Easing::EaseOutCubic.apply(t)
}

// ---------------------------------------------------------------------------
// Animation items
// ---------------------------------------------------------------------------

/// Callback fired once when a played range completes.
pub type CompletionCallback = Box<dyn FnOnce()>;

/// Capability set of an animation handle.
pub trait AnimationItem: std::fmt::Debug {
    /// Jump to a normalized position without playing.
    ///
    /// Stops any range in flight; its completion callback is dropped.
    fn seek(&mut self, position: f64);

    /// Play from `from` to `to` over `duration`.
    ///
    /// Replaces any range in flight; a pending completion callback for the
    /// replaced range is dropped.
    fn play_range(&mut self, from: f64, to: f64, duration: Duration);

    /// Register a callback fired once when the current range completes.
    ///
    /// If nothing is playing the callback is dropped.
    fn on_complete(&mut self, callback: CompletionCallback);

    /// Advance by `dt`.
    fn tick(&mut self, dt: Duration);

    /// Current normalized position.
    fn value(&self) -> f64;

    /// Whether a range is in flight.
    fn is_playing(&self) -> bool;

    /// Stop and release the item. Subsequent calls are no-ops.
    fn dispose(&mut self);

    /// Whether `dispose` was called.
    fn is_disposed(&self) -> bool;
}

pub(crate) fn sanitize_position(v: f64) -> f64 {
    if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn easing_endpoints() {
        for e in [
            Easing::Linear,
            Easing::EaseOutCubic,
            Easing::EaseInCubic,
            Easing::EaseInOutCubic,
        ] {
            assert!((e.apply(0.0)).abs() < 1e-12, "{e:?} at 0");
            assert!((e.apply(1.0) - 1.0).abs() < 1e-12, "{e:?} at 1");
        }
    }

    #[test]
    fn ease_out_is_ahead_of_linear() {
        for i in 1..10 {
            let t = f64::from(i) / 10.0;
            assert!(ease_out_cubic(t) > t);
        }
    }

    #[test]
    fn easing_clamps_out_of_range() {
        assert_eq!(Easing::EaseOutCubic.apply(-1.0), 0.0);
        assert_eq!(Easing::EaseOutCubic.apply(2.0), 1.0);
        assert_eq!(Easing::EaseOutCubic.apply(f64::NAN), 0.0);
    }
}
