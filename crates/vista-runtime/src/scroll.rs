#![forbid(unsafe_code)]

//! Scroll anchoring and programmatic scroll tweens.
//!
//! [`ScrollContainer`] is the seam to the host's scroll root. [`tween_to`]
//! moves it to a target offset: deltas under one pixel snap immediately,
//! anything larger eases out over the requested duration with exactly one
//! write per [`tick`](ScrollTween::tick).
//!
//! # Invariants
//!
//! 1. While a tween runs, native smooth scrolling and snap discipline are
//!    suspended; both are restored when the tween finishes or is cancelled.
//! 2. `cancel()` never writes the scroll position.
//! 3. A finished or cancelled tween ignores further ticks.

use std::time::Duration;

use vista_core::animation::ease_out_cubic;
use vista_core::geometry::Rect;
use vista_layout::ElementId;

/// Snap discipline of the scroll root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SnapMode {
    /// Always settle on a pane boundary.
    #[default]
    Mandatory,
    /// Free scrolling.
    None,
    /// Settle on a boundary only when close to one.
    Proximity,
}

/// Native scroll animation behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ScrollBehavior {
    /// Jump.
    #[default]
    Auto,
    /// Host-animated.
    Smooth,
}

/// A vertically scrolling root.
///
/// Element rectangles are relative to the viewport's top-left corner.
pub trait ScrollContainer {
    /// Current scroll offset.
    fn scroll_top(&self) -> f64;
    /// Write the scroll offset. Implementations clamp to their range.
    fn set_scroll_top(&mut self, top: f64);
    /// Viewport size as a rectangle at the origin.
    fn viewport(&self) -> Rect;
    /// Current native scroll behavior.
    fn scroll_behavior(&self) -> ScrollBehavior;
    /// Set native scroll behavior.
    fn set_scroll_behavior(&mut self, behavior: ScrollBehavior);
    /// Current snap discipline.
    fn snap_mode(&self) -> SnapMode;
    /// Set snap discipline.
    fn set_snap_mode(&mut self, mode: SnapMode);
    /// Offset of an element's top within the scrolled content.
    fn element_offset(&self, element: ElementId) -> Option<f64>;
    /// An element's rectangle relative to the viewport.
    fn element_rect(&self, element: ElementId) -> Option<Rect>;
}

/// Progress of a tween.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TweenStatus {
    /// Still writing.
    Running,
    /// Reached the target.
    Finished,
    /// Stopped early; position left where it was.
    Cancelled,
}

#[derive(Debug, Clone, Copy)]
struct Suspended {
    behavior: ScrollBehavior,
    snap: SnapMode,
}

/// A running (or settled) programmatic scroll.
#[derive(Debug, Clone)]
pub struct ScrollTween {
    from: f64,
    target: f64,
    duration: Duration,
    started_at: Duration,
    suspended: Option<Suspended>,
    status: TweenStatus,
}

/// Start moving `container` to `target`.
///
/// Returns an already-finished tween when the distance is below one pixel
/// or `duration` is zero; the target is written immediately in both cases.
pub fn tween_to<C: ScrollContainer + ?Sized>(
    container: &mut C,
    target: f64,
    duration: Duration,
    now: Duration,
) -> ScrollTween {
    let from = container.scroll_top();
    if duration.is_zero() || (target - from).abs() < 1.0 {
        container.set_scroll_top(target);
        tracing::trace!(target: "vista.scroll", to = target, "snap without tween");
        return ScrollTween {
            from,
            target,
            duration: Duration::ZERO,
            started_at: now,
            suspended: None,
            status: TweenStatus::Finished,
        };
    }

    let suspended = Suspended {
        behavior: container.scroll_behavior(),
        snap: container.snap_mode(),
    };
    container.set_scroll_behavior(ScrollBehavior::Auto);
    container.set_snap_mode(SnapMode::None);
    tracing::debug!(
        target: "vista.scroll",
        from,
        to = target,
        duration_ms = duration.as_millis() as u64,
        "tween started"
    );
    ScrollTween {
        from,
        target,
        duration,
        started_at: now,
        suspended: Some(suspended),
        status: TweenStatus::Running,
    }
}

impl ScrollTween {
    /// Write one frame. Returns the status after the write.
    pub fn tick<C: ScrollContainer + ?Sized>(
        &mut self,
        container: &mut C,
        now: Duration,
    ) -> TweenStatus {
        if self.status != TweenStatus::Running {
            return self.status;
        }
        let elapsed = now.saturating_sub(self.started_at);
        if self.duration.is_zero() || elapsed >= self.duration {
            container.set_scroll_top(self.target);
            self.restore(container);
            self.status = TweenStatus::Finished;
            tracing::debug!(target: "vista.scroll", to = self.target, "tween finished");
            return self.status;
        }
        let t = elapsed.as_secs_f64() / self.duration.as_secs_f64();
        container.set_scroll_top(self.from + (self.target - self.from) * ease_out_cubic(t));
        self.status
    }

    /// Stop without moving. Restores suspended configuration.
    pub fn cancel<C: ScrollContainer + ?Sized>(&mut self, container: &mut C) {
        if self.status != TweenStatus::Running {
            return;
        }
        self.restore(container);
        self.status = TweenStatus::Cancelled;
        tracing::debug!(
            target: "vista.scroll",
            at = container.scroll_top(),
            to = self.target,
            "tween cancelled"
        );
    }

    /// Current status.
    #[inline]
    #[must_use]
    pub fn status(&self) -> TweenStatus {
        self.status
    }

    /// Whether the tween is still writing.
    #[inline]
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.status == TweenStatus::Running
    }

    /// Target offset.
    #[inline]
    #[must_use]
    pub fn target(&self) -> f64 {
        self.target
    }

    fn restore<C: ScrollContainer + ?Sized>(&mut self, container: &mut C) {
        if let Some(saved) = self.suspended.take() {
            container.set_scroll_behavior(saved.behavior);
            container.set_snap_mode(saved.snap);
        }
    }
}
