#![forbid(unsafe_code)]

//! Focus choreography state machine.
//!
//! A single [`FocusState`] per session owns which pane (if any) is focused
//! and which snap discipline the scroll root uses. Like the mount machine it
//! is a value with a transition function; scroll writes, tweens and timers
//! are effects performed by [`FocusController`](crate::focus_driver::FocusController).
//!
//! # State Machine
//!
//! ```text
//!             focus(K)                 candidate dwelled / unfocus
//! Unfocused ───────────▶ Focused ───────────────────────────────▶ ExitAnchoring
//! (mandatory)            (none)                                   (none, tween)
//!     ▲                    ▲  focus(K) always wins                    │
//!     │                    └──────────────────────────────────────────┤
//!     │ ramp elapsed                        linger + tween done,      │
//!     └──────────── ProximityRamp ◀──────── user input, or fallback ──┘
//!                    (proximity)
//! ```
//!
//! # Invariants
//!
//! 1. `snap_mode == SnapMode::None` whenever `focused_key` is set.
//! 2. At most one pane is focused.
//! 3. A focus request is honored in every phase and cancels any exit tween.
//! 4. ExitAnchoring is left normally only after both the linger and the
//!    tween have completed.
//! 5. Timer events whose generation is not current are ignored.

use std::time::Duration;

use vista_layout::PaneKey;

use crate::cancellation::Generation;
use crate::scroll::SnapMode;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Focus choreography parameters.
#[derive(Debug, Clone)]
pub struct FocusConfig {
    /// Settle bump after entry alignment, as a fraction of viewport height.
    pub settle_fraction: f64,
    /// Duration of the settle bump.
    pub settle_duration: Duration,
    /// Minimum visible ratio for an exit candidate.
    pub visibility_floor: f64,
    /// How long a candidate must persist before focus clears.
    pub dwell: Duration,
    /// Minimum time spent exit-anchoring.
    pub linger: Duration,
    /// How long proximity snapping lasts before mandatory snapping resumes.
    pub ramp: Duration,
    /// Duration of the exit tween.
    pub exit_tween: Duration,
    /// Deadline after which exit anchoring ends even without frames.
    pub exit_fallback: Duration,
    /// Height loss of the last focused pane that triggers a correction.
    pub resize_guard_px: f64,
    /// Scroll movement below this does not change direction.
    pub direction_dead_band: f64,
    /// Pointer travel that turns a press into a drag.
    pub drag_threshold: f64,
    /// Skip tweens.
    pub reduced_motion: bool,
}

impl Default for FocusConfig {
    fn default() -> Self {
        Self {
            settle_fraction: 0.10,
            settle_duration: Duration::from_millis(240),
            visibility_floor: 0.20,
            dwell: Duration::from_millis(120),
            linger: Duration::from_millis(200),
            ramp: Duration::from_millis(300),
            exit_tween: Duration::from_millis(500),
            exit_fallback: Duration::from_millis(1500),
            resize_guard_px: 48.0,
            direction_dead_band: 2.0,
            drag_threshold: 6.0,
            reduced_motion: false,
        }
    }
}

impl FocusConfig {
    /// Set the dwell time (builder pattern).
    #[must_use]
    pub fn dwell(mut self, dwell: Duration) -> Self {
        self.dwell = dwell;
        self
    }

    /// Set the visibility floor (builder pattern).
    #[must_use]
    pub fn visibility_floor(mut self, floor: f64) -> Self {
        self.visibility_floor = floor;
        self
    }

    /// Set the proximity ramp (builder pattern).
    #[must_use]
    pub fn ramp(mut self, ramp: Duration) -> Self {
        self.ramp = ramp;
        self
    }

    /// Set the exit tween duration (builder pattern).
    #[must_use]
    pub fn exit_tween(mut self, duration: Duration) -> Self {
        self.exit_tween = duration;
        self
    }

    /// Enable or disable reduced motion (builder pattern).
    #[must_use]
    pub fn reduced_motion(mut self, on: bool) -> Self {
        self.reduced_motion = on;
        self
    }

    /// Settle duration after reduced motion is applied.
    #[must_use]
    pub fn effective_settle(&self) -> Duration {
        if self.reduced_motion {
            Duration::ZERO
        } else {
            self.settle_duration
        }
    }

    /// Exit tween duration after reduced motion is applied.
    #[must_use]
    pub fn effective_exit_tween(&self) -> Duration {
        if self.reduced_motion {
            Duration::ZERO
        } else {
            self.exit_tween
        }
    }
}

// ---------------------------------------------------------------------------
// State, events, effects
// ---------------------------------------------------------------------------

/// Phase of the focus machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FocusPhase {
    /// Nothing focused; mandatory snapping.
    #[default]
    Unfocused,
    /// One pane focused; snapping off.
    Focused,
    /// Tweening to the exit target; snapping off.
    ExitAnchoring {
        /// The linger has elapsed.
        linger_done: bool,
        /// The tween reached its target (or was skipped).
        tween_done: bool,
    },
    /// Proximity snapping before mandatory resumes.
    ProximityRamp,
}

/// Named timers the focus machine arms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FocusTimer {
    /// Candidate persistence.
    Dwell,
    /// Minimum exit-anchoring time.
    Linger,
    /// Proximity ramp.
    Ramp,
    /// Exit-anchoring deadline.
    ExitFallback,
}

impl FocusTimer {
    const COUNT: usize = 4;

    const fn index(self) -> usize {
        match self {
            Self::Dwell => 0,
            Self::Linger => 1,
            Self::Ramp => 2,
            Self::ExitFallback => 3,
        }
    }
}

/// Inputs to the focus machine.
#[derive(Debug, Clone, PartialEq)]
pub enum FocusEvent {
    /// Explicit focus request.
    FocusRequested(PaneKey),
    /// Explicit unfocus request.
    UnfocusRequested,
    /// Result of a per-frame candidate evaluation.
    CandidateObserved(Option<PaneKey>),
    /// The exit tween reached its target, or had nothing to do.
    TweenFinished,
    /// Direct user input (pointer, wheel, touch, key, drag).
    UserInterrupted,
    /// A timer armed by this machine fired.
    TimerElapsed {
        /// Which timer.
        timer: FocusTimer,
        /// Generation it was armed with.
        generation: u64,
    },
}

/// Host-visible notices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FocusNotice {
    /// A pane gained focus.
    Focused(PaneKey),
    /// Focus cleared; the root is anchoring to `exit_target`.
    Unfocused {
        /// Pane being anchored to.
        exit_target: Option<PaneKey>,
    },
    /// The user interrupted exit anchoring.
    Interrupted,
    /// The snap discipline changed.
    SnapModeChanged(SnapMode),
}

/// Side effects requested by the focus machine.
#[derive(Debug, Clone, PartialEq)]
pub enum FocusEffect {
    /// Change the root's snap discipline.
    SetSnapMode(SnapMode),
    /// Align `key` to the viewport top, then settle.
    AlignToTop(PaneKey),
    /// Start the exit tween towards `key`.
    StartExitTween(PaneKey),
    /// Cancel whichever tween is running, leaving the position as-is.
    CancelTween,
    /// Arm a timer.
    ArmTimer {
        /// Which timer.
        timer: FocusTimer,
        /// Delay from now.
        delay: Duration,
        /// Generation to echo back.
        generation: u64,
    },
    /// Disarm a timer.
    CancelTimer(FocusTimer),
    /// Publish a notice.
    Notice(FocusNotice),
}

/// The session's focus state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FocusState {
    /// Current phase.
    pub phase: FocusPhase,
    /// Focused pane.
    pub focused_key: Option<PaneKey>,
    /// Most recently focused pane.
    pub last_focused_key: Option<PaneKey>,
    /// Pane being anchored to after auto-unfocus.
    pub exit_target_key: Option<PaneKey>,
    /// Current snap discipline.
    pub snap_mode: SnapMode,
    /// Exit candidate awaiting its dwell.
    pub candidate: Option<PaneKey>,
    timer_generations: [Generation; FocusTimer::COUNT],
}

impl FocusState {
    /// Current generation of `timer`.
    #[must_use]
    pub fn timer_generation(&self, timer: FocusTimer) -> u64 {
        self.timer_generations[timer.index()].get()
    }

    /// Whether the machine is exit-anchoring.
    #[must_use]
    pub fn is_exit_anchoring(&self) -> bool {
        matches!(self.phase, FocusPhase::ExitAnchoring { .. })
    }

    /// Apply `event`, returning the effects to perform.
    pub fn apply(&mut self, config: &FocusConfig, event: FocusEvent) -> Vec<FocusEffect> {
        let mut step = Step {
            state: self,
            config,
            effects: Vec::new(),
        };
        step.handle(event);
        step.effects
    }
}

/// Pure form of [`FocusState::apply`].
#[must_use]
pub fn transition(
    state: &FocusState,
    config: &FocusConfig,
    event: FocusEvent,
) -> (FocusState, Vec<FocusEffect>) {
    let mut next = state.clone();
    let effects = next.apply(config, event);
    (next, effects)
}

// ---------------------------------------------------------------------------
// Transition logic
// ---------------------------------------------------------------------------

struct Step<'a> {
    state: &'a mut FocusState,
    config: &'a FocusConfig,
    effects: Vec<FocusEffect>,
}

impl Step<'_> {
    fn handle(&mut self, event: FocusEvent) {
        match event {
            FocusEvent::FocusRequested(key) => self.focus(key),
            FocusEvent::UnfocusRequested => {
                if self.state.phase == FocusPhase::Focused {
                    let target = self.state.last_focused_key.clone();
                    self.begin_exit(None, target);
                }
            }
            FocusEvent::CandidateObserved(candidate) => self.candidate(candidate),
            FocusEvent::TweenFinished => {
                if let FocusPhase::ExitAnchoring { linger_done, .. } = self.state.phase {
                    self.state.phase = FocusPhase::ExitAnchoring {
                        linger_done,
                        tween_done: true,
                    };
                    self.maybe_leave_exit();
                }
            }
            FocusEvent::UserInterrupted => {
                if self.state.is_exit_anchoring() {
                    tracing::debug!(target: "vista.focus", "exit anchoring interrupted by user");
                    self.effects.push(FocusEffect::CancelTween);
                    self.effects.push(FocusEffect::Notice(FocusNotice::Interrupted));
                    self.cancel(FocusTimer::Linger);
                    self.cancel(FocusTimer::ExitFallback);
                    self.ramp();
                }
            }
            FocusEvent::TimerElapsed { timer, generation } => self.timer(timer, generation),
        }
    }

    fn focus(&mut self, key: PaneKey) {
        if self.state.is_exit_anchoring() {
            self.effects.push(FocusEffect::CancelTween);
            self.cancel(FocusTimer::Linger);
            self.cancel(FocusTimer::ExitFallback);
        }
        if self.state.phase == FocusPhase::ProximityRamp {
            self.cancel(FocusTimer::Ramp);
        }
        self.clear_candidate();
        self.set_phase(FocusPhase::Focused);
        self.state.focused_key = Some(key.clone());
        self.state.last_focused_key = Some(key.clone());
        self.state.exit_target_key = None;
        self.set_snap(SnapMode::None);
        self.effects.push(FocusEffect::AlignToTop(key.clone()));
        self.effects.push(FocusEffect::Notice(FocusNotice::Focused(key)));
    }

    fn candidate(&mut self, candidate: Option<PaneKey>) {
        if self.state.phase != FocusPhase::Focused || candidate == self.state.candidate {
            return;
        }
        match candidate {
            Some(key) if Some(&key) != self.state.focused_key.as_ref() => {
                tracing::trace!(target: "vista.focus", candidate = %key, "exit candidate");
                self.state.candidate = Some(key);
                self.arm(FocusTimer::Dwell, self.config.dwell);
            }
            _ => self.clear_candidate(),
        }
    }

    fn begin_exit(&mut self, exit_target: Option<PaneKey>, tween_target: Option<PaneKey>) {
        self.clear_candidate();
        self.state.focused_key = None;
        self.state.exit_target_key = exit_target.clone();
        self.set_phase(FocusPhase::ExitAnchoring {
            linger_done: false,
            tween_done: false,
        });
        self.arm(FocusTimer::Linger, self.config.linger);
        self.arm(FocusTimer::ExitFallback, self.config.exit_fallback);
        self.effects
            .push(FocusEffect::Notice(FocusNotice::Unfocused { exit_target }));
        match tween_target {
            Some(key) => self.effects.push(FocusEffect::StartExitTween(key)),
            None => {
                self.state.phase = FocusPhase::ExitAnchoring {
                    linger_done: false,
                    tween_done: true,
                };
            }
        }
    }

    fn timer(&mut self, timer: FocusTimer, generation: u64) {
        if !self.state.timer_generations[timer.index()].is_current(generation) {
            tracing::trace!(target: "vista.focus", ?timer, generation, "stale timer ignored");
            return;
        }
        match timer {
            FocusTimer::Dwell => {
                if self.state.phase == FocusPhase::Focused
                    && let Some(key) = self.state.candidate.clone()
                {
                    tracing::debug!(target: "vista.focus", exit_target = %key, "auto-unfocus");
                    self.begin_exit(Some(key.clone()), Some(key));
                }
            }
            FocusTimer::Linger => {
                if let FocusPhase::ExitAnchoring { tween_done, .. } = self.state.phase {
                    self.state.phase = FocusPhase::ExitAnchoring {
                        linger_done: true,
                        tween_done,
                    };
                    self.maybe_leave_exit();
                }
            }
            FocusTimer::ExitFallback => {
                if self.state.is_exit_anchoring() {
                    tracing::debug!(target: "vista.focus", "exit anchoring fallback deadline");
                    self.effects.push(FocusEffect::CancelTween);
                    self.cancel(FocusTimer::Linger);
                    self.ramp();
                }
            }
            FocusTimer::Ramp => {
                if self.state.phase == FocusPhase::ProximityRamp {
                    self.state.exit_target_key = None;
                    self.set_phase(FocusPhase::Unfocused);
                    self.set_snap(SnapMode::Mandatory);
                }
            }
        }
    }

    // -- helpers ------------------------------------------------------------

    fn maybe_leave_exit(&mut self) {
        if let FocusPhase::ExitAnchoring {
            linger_done: true,
            tween_done: true,
        } = self.state.phase
        {
            self.cancel(FocusTimer::ExitFallback);
            self.ramp();
        }
    }

    fn ramp(&mut self) {
        self.set_phase(FocusPhase::ProximityRamp);
        self.set_snap(SnapMode::Proximity);
        self.arm(FocusTimer::Ramp, self.config.ramp);
    }

    fn clear_candidate(&mut self) {
        if self.state.candidate.take().is_some() {
            self.cancel(FocusTimer::Dwell);
        }
    }

    fn set_phase(&mut self, to: FocusPhase) {
        let from = self.state.phase;
        if from != to {
            self.state.phase = to;
            tracing::debug!(target: "vista.focus", ?from, ?to, "phase change");
        }
    }

    fn set_snap(&mut self, mode: SnapMode) {
        if self.state.snap_mode != mode {
            self.state.snap_mode = mode;
            self.effects
                .push(FocusEffect::Notice(FocusNotice::SnapModeChanged(mode)));
        }
        self.effects.push(FocusEffect::SetSnapMode(mode));
    }

    fn arm(&mut self, timer: FocusTimer, delay: Duration) {
        let generation = self.state.timer_generations[timer.index()].bump();
        self.effects.push(FocusEffect::ArmTimer {
            timer,
            delay,
            generation,
        });
    }

    fn cancel(&mut self, timer: FocusTimer) {
        self.state.timer_generations[timer.index()].bump();
        self.effects.push(FocusEffect::CancelTimer(timer));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn key(k: &str) -> PaneKey {
        PaneKey::new(k)
    }

    fn fire(state: &mut FocusState, config: &FocusConfig, timer: FocusTimer) -> Vec<FocusEffect> {
        let generation = state.timer_generation(timer);
        state.apply(config, FocusEvent::TimerElapsed { timer, generation })
    }

    fn focused_on_game() -> (FocusState, FocusConfig) {
        let config = FocusConfig::default();
        let mut state = FocusState::default();
        state.apply(&config, FocusEvent::FocusRequested(key("game")));
        (state, config)
    }

    #[test]
    fn focus_disables_snap_and_aligns() {
        let config = FocusConfig::default();
        let mut state = FocusState::default();
        let fx = state.apply(&config, FocusEvent::FocusRequested(key("game")));
        assert_eq!(state.phase, FocusPhase::Focused);
        assert_eq!(state.focused_key, Some(key("game")));
        assert_eq!(state.last_focused_key, Some(key("game")));
        assert_eq!(state.snap_mode, SnapMode::None);
        assert!(fx.contains(&FocusEffect::SetSnapMode(SnapMode::None)));
        assert!(fx.contains(&FocusEffect::AlignToTop(key("game"))));
    }

    #[test]
    fn candidate_must_dwell() {
        let (mut state, config) = focused_on_game();
        let fx = state.apply(&config, FocusEvent::CandidateObserved(Some(key("scoop"))));
        assert!(matches!(
            fx.as_slice(),
            [FocusEffect::ArmTimer { timer: FocusTimer::Dwell, .. }]
        ));
        assert_eq!(state.focused_key, Some(key("game")));

        // Same candidate again does not restart the dwell.
        assert!(state
            .apply(&config, FocusEvent::CandidateObserved(Some(key("scoop"))))
            .is_empty());

        let fx = fire(&mut state, &config, FocusTimer::Dwell);
        assert_eq!(state.focused_key, None);
        assert_eq!(state.exit_target_key, Some(key("scoop")));
        assert!(state.is_exit_anchoring());
        assert!(fx.contains(&FocusEffect::StartExitTween(key("scoop"))));
        assert_eq!(state.snap_mode, SnapMode::None);
    }

    #[test]
    fn candidate_change_restarts_dwell() {
        let (mut state, config) = focused_on_game();
        state.apply(&config, FocusEvent::CandidateObserved(Some(key("scoop"))));
        let stale = state.timer_generation(FocusTimer::Dwell);
        state.apply(&config, FocusEvent::CandidateObserved(None));
        state.apply(
            &config,
            FocusEvent::TimerElapsed {
                timer: FocusTimer::Dwell,
                generation: stale,
            },
        );
        assert_eq!(state.phase, FocusPhase::Focused);
    }

    #[test]
    fn focused_pane_is_not_a_candidate() {
        let (mut state, config) = focused_on_game();
        assert!(state
            .apply(&config, FocusEvent::CandidateObserved(Some(key("game"))))
            .is_empty());
        assert_eq!(state.candidate, None);
    }

    #[test]
    fn exit_needs_linger_and_tween() {
        let (mut state, config) = focused_on_game();
        state.apply(&config, FocusEvent::CandidateObserved(Some(key("scoop"))));
        fire(&mut state, &config, FocusTimer::Dwell);

        state.apply(&config, FocusEvent::TweenFinished);
        assert!(state.is_exit_anchoring(), "linger still running");
        fire(&mut state, &config, FocusTimer::Linger);
        assert_eq!(state.phase, FocusPhase::ProximityRamp);
        assert_eq!(state.snap_mode, SnapMode::Proximity);

        fire(&mut state, &config, FocusTimer::Ramp);
        assert_eq!(state.phase, FocusPhase::Unfocused);
        assert_eq!(state.snap_mode, SnapMode::Mandatory);
        assert_eq!(state.exit_target_key, None);
    }

    #[test]
    fn user_input_during_exit_goes_to_ramp() {
        let (mut state, config) = focused_on_game();
        state.apply(&config, FocusEvent::CandidateObserved(Some(key("scoop"))));
        fire(&mut state, &config, FocusTimer::Dwell);
        let fx = state.apply(&config, FocusEvent::UserInterrupted);
        assert_eq!(fx.first(), Some(&FocusEffect::CancelTween));
        assert_eq!(state.phase, FocusPhase::ProximityRamp);
        assert_eq!(state.snap_mode, SnapMode::Proximity);

        // The cancelled linger can no longer move the machine.
        let stale = state.timer_generation(FocusTimer::Linger);
        let fx = state.apply(
            &config,
            FocusEvent::TimerElapsed {
                timer: FocusTimer::Linger,
                generation: stale.wrapping_sub(1),
            },
        );
        assert!(fx.is_empty());
    }

    #[test]
    fn user_input_while_focused_is_ignored() {
        let (mut state, config) = focused_on_game();
        assert!(state.apply(&config, FocusEvent::UserInterrupted).is_empty());
        assert_eq!(state.phase, FocusPhase::Focused);
    }

    #[test]
    fn refocus_wins_over_exit_tween() {
        let (mut state, config) = focused_on_game();
        state.apply(&config, FocusEvent::CandidateObserved(Some(key("scoop"))));
        fire(&mut state, &config, FocusTimer::Dwell);
        let fx = state.apply(&config, FocusEvent::FocusRequested(key("rotary")));
        assert_eq!(fx.first(), Some(&FocusEffect::CancelTween));
        assert_eq!(state.phase, FocusPhase::Focused);
        assert_eq!(state.focused_key, Some(key("rotary")));
        assert_eq!(state.exit_target_key, None);
        assert_eq!(state.snap_mode, SnapMode::None);
    }

    #[test]
    fn explicit_unfocus_anchors_to_last_focused() {
        let (mut state, config) = focused_on_game();
        let fx = state.apply(&config, FocusEvent::UnfocusRequested);
        assert!(fx.contains(&FocusEffect::StartExitTween(key("game"))));
        assert_eq!(state.exit_target_key, None);
        assert_eq!(state.focused_key, None);
    }

    #[test]
    fn fallback_deadline_ends_exit() {
        let (mut state, config) = focused_on_game();
        state.apply(&config, FocusEvent::UnfocusRequested);
        let fx = fire(&mut state, &config, FocusTimer::ExitFallback);
        assert!(fx.contains(&FocusEffect::CancelTween));
        assert_eq!(state.phase, FocusPhase::ProximityRamp);
    }

    #[test]
    fn snap_none_whenever_focused() {
        let config = FocusConfig::default();
        let mut state = FocusState::default();
        let events = [
            FocusEvent::FocusRequested(key("a")),
            FocusEvent::CandidateObserved(Some(key("b"))),
            FocusEvent::FocusRequested(key("b")),
            FocusEvent::UnfocusRequested,
            FocusEvent::UserInterrupted,
            FocusEvent::FocusRequested(key("c")),
        ];
        for event in events {
            state.apply(&config, event);
            if state.focused_key.is_some() {
                assert_eq!(state.snap_mode, SnapMode::None);
            }
        }
    }
}
