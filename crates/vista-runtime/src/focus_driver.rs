#![forbid(unsafe_code)]

//! Driver for the session's [`FocusState`] machine.
//!
//! [`FocusController`] performs the machine's effects against a
//! [`ScrollContainer`]: it aligns panes, runs entry and exit tweens, arms
//! timers, and evaluates exit candidates at most once per frame after
//! scroll activity. It also turns raw input into user-takeover signals,
//! synthesizing drag intent from pointer and touch movement.
//!
//! # Invariants
//!
//! 1. At most one tween (entry or exit) runs at a time.
//! 2. Candidate evaluation never runs while the entry tween is settling.
//! 3. A missing scroll target never blocks a focus transition: alignment
//!    becomes a no-op and an exit tween counts as finished.
//! 4. After `teardown`, every call is a no-op.

use std::collections::VecDeque;
use std::time::Duration;

use vista_core::event::InputEvent;
use vista_core::gesture::{
    GestureConfig, GestureRecognizer, ScrollDirection, ScrollDirectionTracker,
};
use vista_layout::{CandidateSample, PaneKey, PaneRegistry, pick_exit_candidate};

use crate::error::FocusError;
use crate::focus::{
    FocusConfig, FocusEffect, FocusEvent, FocusNotice, FocusPhase, FocusState, FocusTimer,
};
use crate::scroll::{ScrollContainer, ScrollTween, SnapMode, TweenStatus, tween_to};
use crate::timer::TimerQueue;

/// What title displays and scroll-blocking guards need to know.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusSnapshot {
    /// Focused pane.
    pub focused_key: Option<PaneKey>,
    /// Pane being anchored to after auto-unfocus.
    pub exit_target_key: Option<PaneKey>,
    /// Current snap discipline.
    pub snap_mode: SnapMode,
    /// Current phase.
    pub phase: FocusPhase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TweenKind {
    Entry,
    Exit,
}

#[derive(Debug)]
struct ActiveTween {
    kind: TweenKind,
    tween: ScrollTween,
}

/// Drives focus choreography for one session.
#[derive(Debug)]
pub struct FocusController {
    config: FocusConfig,
    state: FocusState,
    timers: TimerQueue<FocusTimer>,
    tween: Option<ActiveTween>,
    direction: ScrollDirectionTracker,
    gestures: GestureRecognizer,
    evaluation_pending: bool,
    exit_anchor_height: Option<f64>,
    notices: Vec<FocusNotice>,
    disposed: bool,
}

impl FocusController {
    /// Create an unfocused controller.
    #[must_use]
    pub fn new(config: FocusConfig) -> Self {
        let gestures = GestureRecognizer::new(GestureConfig {
            drag_threshold: config.drag_threshold,
            direction_dead_band: config.direction_dead_band,
        });
        Self {
            direction: ScrollDirectionTracker::new(config.direction_dead_band),
            gestures,
            config,
            state: FocusState::default(),
            timers: TimerQueue::new(),
            tween: None,
            evaluation_pending: false,
            exit_anchor_height: None,
            notices: Vec::new(),
            disposed: false,
        }
    }

    /// Focus `key`. Wins over any exit tween in flight.
    pub fn request_focus<C: ScrollContainer + ?Sized>(
        &mut self,
        registry: &PaneRegistry,
        key: &PaneKey,
        container: &mut C,
        now: Duration,
    ) -> Result<(), FocusError> {
        if self.disposed {
            return Err(FocusError::Disposed);
        }
        if !registry.contains(key) {
            return Err(FocusError::UnknownPane(key.clone()));
        }
        self.fire_due(registry, container, now);
        self.dispatch(FocusEvent::FocusRequested(key.clone()), registry, container, now);
        Ok(())
    }

    /// Clear focus and anchor back to the last focused pane.
    pub fn request_unfocus<C: ScrollContainer + ?Sized>(
        &mut self,
        registry: &PaneRegistry,
        container: &mut C,
        now: Duration,
    ) -> Result<(), FocusError> {
        if self.disposed {
            return Err(FocusError::Disposed);
        }
        self.fire_due(registry, container, now);
        self.dispatch(FocusEvent::UnfocusRequested, registry, container, now);
        Ok(())
    }

    /// The scroll root moved. Evaluation happens on the next frame.
    pub fn on_scroll<C: ScrollContainer + ?Sized>(&mut self, container: &C) {
        if self.disposed {
            return;
        }
        self.direction.observe(container.scroll_top());
        self.evaluation_pending = true;
    }

    /// Layout changed: re-evaluate next frame and apply the resize guard.
    pub fn on_layout<C: ScrollContainer + ?Sized>(
        &mut self,
        registry: &PaneRegistry,
        container: &mut C,
        now: Duration,
    ) {
        if self.disposed {
            return;
        }
        self.evaluation_pending = true;
        self.resize_guard(registry, container, now);
    }

    /// Animation frame: fire timers, write one tween step, evaluate candidates.
    pub fn on_frame<C: ScrollContainer + ?Sized>(
        &mut self,
        registry: &PaneRegistry,
        container: &mut C,
        now: Duration,
    ) {
        if self.disposed {
            return;
        }
        self.fire_due(registry, container, now);
        self.tick_tween(registry, container, now);

        let settling = self.tween.as_ref().is_some_and(|t| t.kind == TweenKind::Entry);
        if self.evaluation_pending && !settling {
            self.evaluation_pending = false;
            if self.state.phase == FocusPhase::Focused {
                let candidate = self.evaluate(registry, container);
                self.dispatch(FocusEvent::CandidateObserved(candidate), registry, container, now);
            }
        }
    }

    /// Direct user input. Any takeover cancels the running tween in place.
    pub fn on_input<C: ScrollContainer + ?Sized>(
        &mut self,
        event: &InputEvent,
        registry: &PaneRegistry,
        container: &mut C,
        now: Duration,
    ) {
        if self.disposed {
            return;
        }
        let drag = self.gestures.process(event);
        if !event.is_user_takeover() && drag.is_none() {
            return;
        }
        if self.tween.as_ref().is_some_and(|t| t.kind == TweenKind::Entry) {
            tracing::debug!(target: "vista.focus", "entry settle interrupted by user");
            self.cancel_tween(container);
            self.direction.reset_to(container.scroll_top());
        }
        self.fire_due(registry, container, now);
        self.dispatch(FocusEvent::UserInterrupted, registry, container, now);
    }

    /// Fire due timers without a frame (hosts that throttle frames).
    pub fn advance<C: ScrollContainer + ?Sized>(
        &mut self,
        registry: &PaneRegistry,
        container: &mut C,
        now: Duration,
    ) {
        if self.disposed {
            return;
        }
        self.fire_due(registry, container, now);
    }

    /// Cancel tweens (restoring scroll configuration) and drop all timers.
    pub fn teardown<C: ScrollContainer + ?Sized>(&mut self, container: &mut C) {
        if self.disposed {
            return;
        }
        self.cancel_tween(container);
        self.timers.clear();
        self.gestures.reset();
        self.disposed = true;
        tracing::debug!(target: "vista.focus", "torn down");
    }

    // -- queries ------------------------------------------------------------

    /// Snapshot for hosts.
    #[must_use]
    pub fn snapshot(&self) -> FocusSnapshot {
        FocusSnapshot {
            focused_key: self.state.focused_key.clone(),
            exit_target_key: self.state.exit_target_key.clone(),
            snap_mode: self.state.snap_mode,
            phase: self.state.phase,
        }
    }

    /// Focused pane.
    #[must_use]
    pub fn focused_key(&self) -> Option<&PaneKey> {
        self.state.focused_key.as_ref()
    }

    /// Current snap discipline.
    #[must_use]
    pub fn snap_mode(&self) -> SnapMode {
        self.state.snap_mode
    }

    /// Full machine state.
    #[must_use]
    pub fn state(&self) -> &FocusState {
        &self.state
    }

    /// Last derived scroll direction.
    #[must_use]
    pub fn scroll_direction(&self) -> ScrollDirection {
        self.direction.direction()
    }

    /// Whether a tween is running.
    #[must_use]
    pub fn is_tweening(&self) -> bool {
        self.tween.as_ref().is_some_and(|t| t.tween.is_running())
    }

    /// Earliest armed timer deadline.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.next_deadline()
    }

    /// Take pending notices.
    pub fn drain_notices(&mut self) -> Vec<FocusNotice> {
        std::mem::take(&mut self.notices)
    }

    // -- internals ----------------------------------------------------------

    fn dispatch<C: ScrollContainer + ?Sized>(
        &mut self,
        event: FocusEvent,
        registry: &PaneRegistry,
        container: &mut C,
        now: Duration,
    ) {
        let mut queue = VecDeque::from([event]);
        while let Some(event) = queue.pop_front() {
            let _span =
                tracing::debug_span!("focus.transition", phase = ?self.state.phase).entered();
            for effect in self.state.apply(&self.config, event) {
                match effect {
                    FocusEffect::SetSnapMode(mode) => container.set_snap_mode(mode),
                    FocusEffect::AlignToTop(key) => self.align(registry, &key, container, now),
                    FocusEffect::StartExitTween(key) => {
                        if self.start_exit_tween(registry, &key, container, now) {
                            queue.push_back(FocusEvent::TweenFinished);
                        }
                    }
                    FocusEffect::CancelTween => self.cancel_tween(container),
                    FocusEffect::ArmTimer {
                        timer,
                        delay,
                        generation,
                    } => self.timers.schedule(timer, now.saturating_add(delay), generation),
                    FocusEffect::CancelTimer(timer) => {
                        self.timers.cancel(timer);
                    }
                    FocusEffect::Notice(notice) => self.notices.push(notice),
                }
            }
        }
    }

    fn fire_due<C: ScrollContainer + ?Sized>(
        &mut self,
        registry: &PaneRegistry,
        container: &mut C,
        now: Duration,
    ) {
        while let Some(fired) = self.timers.pop_due(now) {
            self.dispatch(
                FocusEvent::TimerElapsed {
                    timer: fired.kind,
                    generation: fired.generation,
                },
                registry,
                container,
                fired.at,
            );
        }
    }

    fn tick_tween<C: ScrollContainer + ?Sized>(
        &mut self,
        registry: &PaneRegistry,
        container: &mut C,
        now: Duration,
    ) {
        let Some(active) = self.tween.as_mut() else {
            return;
        };
        match active.tween.tick(container, now) {
            TweenStatus::Running => {}
            TweenStatus::Cancelled => self.tween = None,
            TweenStatus::Finished => {
                let kind = active.kind;
                self.tween = None;
                match kind {
                    TweenKind::Entry => self.direction.reset_to(container.scroll_top()),
                    TweenKind::Exit => {
                        self.dispatch(FocusEvent::TweenFinished, registry, container, now);
                    }
                }
            }
        }
    }

    fn cancel_tween<C: ScrollContainer + ?Sized>(&mut self, container: &mut C) {
        if let Some(mut active) = self.tween.take() {
            active.tween.cancel(container);
        }
    }

    fn align<C: ScrollContainer + ?Sized>(
        &mut self,
        registry: &PaneRegistry,
        key: &PaneKey,
        container: &mut C,
        now: Duration,
    ) {
        self.cancel_tween(container);
        let Some(offset) = registry.element(key).and_then(|e| container.element_offset(e)) else {
            tracing::debug!(target: "vista.focus", pane = %key, "alignment target missing");
            return;
        };
        container.set_scroll_top(offset);
        let bump = self.config.settle_fraction * container.viewport().height;
        let tween = tween_to(container, offset + bump, self.config.effective_settle(), now);
        if tween.is_running() {
            self.tween = Some(ActiveTween {
                kind: TweenKind::Entry,
                tween,
            });
        } else {
            self.direction.reset_to(container.scroll_top());
        }
    }

    /// Returns `true` when there is nothing to tween.
    fn start_exit_tween<C: ScrollContainer + ?Sized>(
        &mut self,
        registry: &PaneRegistry,
        key: &PaneKey,
        container: &mut C,
        now: Duration,
    ) -> bool {
        self.cancel_tween(container);
        self.exit_anchor_height = self
            .state
            .last_focused_key
            .as_ref()
            .and_then(|k| registry.element(k))
            .and_then(|e| container.element_rect(e))
            .map(|r| r.height);
        let Some(offset) = registry.element(key).and_then(|e| container.element_offset(e)) else {
            tracing::debug!(target: "vista.focus", pane = %key, "exit target missing");
            return true;
        };
        let tween = tween_to(container, offset, self.config.effective_exit_tween(), now);
        if tween.is_running() {
            self.tween = Some(ActiveTween {
                kind: TweenKind::Exit,
                tween,
            });
            false
        } else {
            true
        }
    }

    fn evaluate<C: ScrollContainer + ?Sized>(
        &self,
        registry: &PaneRegistry,
        container: &C,
    ) -> Option<PaneKey> {
        let focused = self.state.focused_key.as_ref()?;
        let focused_index = registry.index_of(focused)?;
        let viewport = container.viewport();
        let samples: Vec<CandidateSample> = registry
            .iter()
            .enumerate()
            .filter_map(|(i, pane)| {
                let rect = container.element_rect(pane.element?)?;
                Some(CandidateSample::measure(i, &rect, &viewport))
            })
            .collect();
        let (before, after) = registry.neighbors(focused);
        let toward = match self.direction.direction() {
            ScrollDirection::Down => after,
            ScrollDirection::Up => before,
            ScrollDirection::Still => None,
        }
        .and_then(|key| registry.index_of(key));
        let index =
            pick_exit_candidate(&samples, focused_index, toward, self.config.visibility_floor)?;
        registry.key_at(index).cloned()
    }

    fn resize_guard<C: ScrollContainer + ?Sized>(
        &mut self,
        registry: &PaneRegistry,
        container: &mut C,
        now: Duration,
    ) {
        if !self.tween.as_ref().is_some_and(|t| t.kind == TweenKind::Exit) {
            return;
        }
        let Some(anchor_height) = self.exit_anchor_height else {
            return;
        };
        let Some(height) = self
            .state
            .last_focused_key
            .as_ref()
            .and_then(|k| registry.element(k))
            .and_then(|e| container.element_rect(e))
            .map(|r| r.height)
        else {
            return;
        };
        if anchor_height - height <= self.config.resize_guard_px {
            return;
        }
        let target = self
            .state
            .exit_target_key
            .clone()
            .or_else(|| self.state.last_focused_key.clone());
        tracing::debug!(
            target: "vista.focus",
            shrink = anchor_height - height,
            "resize guard correcting exit anchor"
        );
        self.cancel_tween(container);
        if let Some(offset) = target
            .as_ref()
            .and_then(|k| registry.element(k))
            .and_then(|e| container.element_offset(e))
        {
            container.set_scroll_top(offset);
        }
        self.exit_anchor_height = Some(height);
        self.dispatch(FocusEvent::TweenFinished, registry, container, now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vista_core::event::{PointerEvent, PointerEventKind};
    use vista_core::geometry::Rect;
    use vista_layout::ElementId;

    use crate::scroll::ScrollBehavior;

    /// Equal-height panes stacked from offset 0; element ids are indices.
    struct Column {
        top: f64,
        heights: Vec<f64>,
        snap: SnapMode,
        behavior: ScrollBehavior,
    }

    impl Column {
        fn new(n: usize) -> Self {
            Self {
                top: 0.0,
                heights: vec![800.0; n],
                snap: SnapMode::Mandatory,
                behavior: ScrollBehavior::Smooth,
            }
        }
    }

    impl ScrollContainer for Column {
        fn scroll_top(&self) -> f64 {
            self.top
        }
        fn set_scroll_top(&mut self, top: f64) {
            let max = (self.heights.iter().sum::<f64>() - 800.0).max(0.0);
            self.top = top.clamp(0.0, max);
        }
        fn viewport(&self) -> Rect {
            Rect::from_size(1000.0, 800.0)
        }
        fn scroll_behavior(&self) -> ScrollBehavior {
            self.behavior
        }
        fn set_scroll_behavior(&mut self, behavior: ScrollBehavior) {
            self.behavior = behavior;
        }
        fn snap_mode(&self) -> SnapMode {
            self.snap
        }
        fn set_snap_mode(&mut self, mode: SnapMode) {
            self.snap = mode;
        }
        fn element_offset(&self, element: ElementId) -> Option<f64> {
            let i = usize::try_from(element.0).ok()?;
            (i < self.heights.len()).then(|| self.heights[..i].iter().sum())
        }
        fn element_rect(&self, element: ElementId) -> Option<Rect> {
            let offset = self.element_offset(element)?;
            let height = self.heights[usize::try_from(element.0).ok()?];
            Some(Rect::new(0.0, offset - self.top, 1000.0, height))
        }
    }

    const fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn setup() -> (PaneRegistry, Column, FocusController) {
        let mut registry = PaneRegistry::new(["a", "b", "c"]).unwrap();
        for (i, k) in ["a", "b", "c"].into_iter().enumerate() {
            registry.attach(&k.into(), ElementId(i as u64)).unwrap();
        }
        (registry, Column::new(3), FocusController::new(FocusConfig::default()))
    }

    #[test]
    fn unknown_pane_is_an_error() {
        let (registry, mut col, mut focus) = setup();
        let err = focus
            .request_focus(&registry, &"zzz".into(), &mut col, ms(0))
            .unwrap_err();
        assert_eq!(err, FocusError::UnknownPane("zzz".into()));
    }

    #[test]
    fn entry_settles_with_bump() {
        let (registry, mut col, mut focus) = setup();
        focus.request_focus(&registry, &"b".into(), &mut col, ms(0)).unwrap();
        assert_eq!(col.top, 800.0);
        assert_eq!(col.snap, SnapMode::None);
        focus.on_frame(&registry, &mut col, ms(240));
        assert_eq!(col.top, 880.0);
        assert_eq!(col.snap, SnapMode::None);
        assert!(!focus.is_tweening());
    }

    #[test]
    fn missing_target_still_focuses() {
        let (mut registry, mut col, mut focus) = setup();
        registry.detach(&"b".into()).unwrap();
        focus.request_focus(&registry, &"b".into(), &mut col, ms(0)).unwrap();
        assert_eq!(col.top, 0.0);
        assert_eq!(focus.focused_key(), Some(&PaneKey::new("b")));
    }

    #[test]
    fn hover_does_not_interrupt_but_press_does() {
        let (registry, mut col, mut focus) = setup();
        focus.request_focus(&registry, &"b".into(), &mut col, ms(0)).unwrap();
        let hover = InputEvent::Pointer(PointerEvent::new(PointerEventKind::Moved, 1.0, 1.0));
        focus.on_input(&hover, &registry, &mut col, ms(10));
        assert!(focus.is_tweening());
        let press = InputEvent::Pointer(PointerEvent::new(PointerEventKind::Down, 1.0, 1.0));
        focus.on_input(&press, &registry, &mut col, ms(20));
        assert!(!focus.is_tweening());
        assert_eq!(col.top, 800.0, "position left where it was");
    }

    #[test]
    fn explicit_unfocus_tweens_back_and_ramps() {
        let (registry, mut col, mut focus) = setup();
        focus.request_focus(&registry, &"b".into(), &mut col, ms(0)).unwrap();
        focus.on_frame(&registry, &mut col, ms(240));
        focus.request_unfocus(&registry, &mut col, ms(300)).unwrap();
        assert!(focus.state().is_exit_anchoring());
        focus.on_frame(&registry, &mut col, ms(800));
        assert_eq!(col.top, 800.0);
        assert_eq!(focus.snap_mode(), SnapMode::Proximity);
        focus.advance(&registry, &mut col, ms(1_100));
        assert_eq!(focus.snap_mode(), SnapMode::Mandatory);
        assert_eq!(col.snap, SnapMode::Mandatory);
    }

    #[test]
    fn registry_neighbour_in_scroll_direction_beats_nearest_centre() {
        let (registry, mut col, mut focus) = setup();
        col.heights = vec![800.0, 400.0, 800.0];
        focus.request_focus(&registry, &"b".into(), &mut col, ms(0)).unwrap();
        focus.on_frame(&registry, &mut col, ms(240));
        assert_eq!(col.top, 880.0);

        // `c` ends up nearer the viewport centre, but the user moves up.
        focus.on_scroll(&col);
        col.top = 620.0;
        focus.on_scroll(&col);
        focus.on_frame(&registry, &mut col, ms(300));
        assert_eq!(focus.scroll_direction(), ScrollDirection::Up);
        assert_eq!(focus.state().candidate, Some(PaneKey::new("a")));
    }

    #[test]
    fn resize_guard_snaps_to_target() {
        let (registry, mut col, mut focus) = setup();
        focus.request_focus(&registry, &"b".into(), &mut col, ms(0)).unwrap();
        focus.on_frame(&registry, &mut col, ms(240));
        focus.request_unfocus(&registry, &mut col, ms(300)).unwrap();
        col.heights[1] = 700.0;
        focus.on_layout(&registry, &mut col, ms(320));
        assert!(!focus.is_tweening());
        assert_eq!(col.top, 800.0);
    }

    #[test]
    fn teardown_restores_and_disables() {
        let (registry, mut col, mut focus) = setup();
        focus.request_focus(&registry, &"b".into(), &mut col, ms(0)).unwrap();
        focus.teardown(&mut col);
        assert!(!focus.is_tweening());
        assert_eq!(col.behavior, ScrollBehavior::Smooth);
        assert_eq!(
            focus.request_focus(&registry, &"a".into(), &mut col, ms(5)),
            Err(FocusError::Disposed)
        );
    }
}
