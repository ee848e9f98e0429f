#![forbid(unsafe_code)]

//! Progressive mount state machine.
//!
//! One machine per lazily loaded content unit. It is a plain value
//! ([`MountState`]) with a transition function that consumes a
//! [`MountEvent`] and returns the [`MountEffect`]s the driver must perform.
//! The machine never reads a clock, touches a timer, or talks to a loader.
//!
//! # State Machine
//!
//! ```text
//! Unloaded ──fetch──▶ Preloading ──resolved, not wanted──▶ ReadyHidden
//!                        │                                    │ Enter
//!                        └──resolved, wanted──▶ Entering ◀────┘
//!                                                  │ fade_in
//!            UnmountedRetained ◀──fade_out── Exiting ◀──unmount_delay── Visible
//!                   │ Enter                     │ Enter                  ▲
//!                   └──────────▶ Entering ◀─────┘                        │
//!                                   └────────────────────────────────────┘
//! ```
//!
//! # Invariants
//!
//! 1. Entering and Exiting never overlap; entering cancels a pending fade-out
//!    and exiting cancels a pending fade-in.
//! 2. At most one fetch is requested while one is in flight.
//! 3. An Exit followed by an Enter within `unmount_delay` produces no fade.
//! 4. An Exit less than `unmount_delay` after the Enter that made the unit
//!    wanted is swallowed: the unit stays put and no fade starts. Only a
//!    later exit edge (after a fresh Enter) takes the unmount path.
//!    Explicit deactivation is never deferred.
//! 5. Timer events whose generation is not current are ignored.
//! 6. After `Dispose`, every event is ignored.
//!
//! # Failure Modes
//!
//! - A failed fetch leaves the unit in `Preloading` with `fetch_failed` set.
//!   Nothing retries it until an explicit `Activate`.
//! - Without a visibility sensor, a visibility-driven unit mounts as
//!   `Immediate` (fail open).

use std::time::Duration;

use vista_layout::Thresholds;

use crate::cancellation::Generation;
use crate::error::FetchError;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// When a unit first mounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "policy-config", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "policy-config", serde(rename_all = "snake_case"))]
pub enum MountMode {
    /// At construction.
    Immediate,
    /// On the first idle signal, or at `idle_timeout`.
    Idle,
    /// On the first Enter crossing.
    #[default]
    VisibilityDriven,
}

/// Per-unit mount parameters.
#[derive(Debug, Clone)]
pub struct MountConfig {
    /// When the unit first mounts.
    pub mode: MountMode,
    /// Fetch the module on the first idle signal.
    pub preload_on_idle: bool,
    /// Fetch the module the first time the element intersects the root.
    pub preload_on_first_visibility: bool,
    /// Fade-in duration.
    pub fade_in: Duration,
    /// Fade-out duration.
    pub fade_out: Duration,
    /// Debounce before an Exit starts the fade-out.
    pub unmount_delay: Duration,
    /// Fallback deadline for the idle signal.
    pub idle_timeout: Duration,
    /// Sensor thresholds.
    pub thresholds: Thresholds,
    /// Skip fades entirely.
    pub reduced_motion: bool,
}

impl Default for MountConfig {
    fn default() -> Self {
        Self {
            mode: MountMode::VisibilityDriven,
            preload_on_idle: false,
            preload_on_first_visibility: true,
            fade_in: Duration::from_millis(300),
            fade_out: Duration::from_millis(200),
            unmount_delay: Duration::from_millis(150),
            idle_timeout: Duration::from_millis(2000),
            thresholds: Thresholds::default(),
            reduced_motion: false,
        }
    }
}

impl MountConfig {
    /// Set the mount mode (builder pattern).
    #[must_use]
    pub fn mode(mut self, mode: MountMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set idle preloading (builder pattern).
    #[must_use]
    pub fn preload_on_idle(mut self, on: bool) -> Self {
        self.preload_on_idle = on;
        self
    }

    /// Set first-visibility preloading (builder pattern).
    #[must_use]
    pub fn preload_on_first_visibility(mut self, on: bool) -> Self {
        self.preload_on_first_visibility = on;
        self
    }

    /// Set both fade durations (builder pattern).
    #[must_use]
    pub fn fades(mut self, fade_in: Duration, fade_out: Duration) -> Self {
        self.fade_in = fade_in;
        self.fade_out = fade_out;
        self
    }

    /// Set the unmount delay (builder pattern).
    #[must_use]
    pub fn unmount_delay(mut self, delay: Duration) -> Self {
        self.unmount_delay = delay;
        self
    }

    /// Set the idle fallback (builder pattern).
    #[must_use]
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Set sensor thresholds (builder pattern).
    #[must_use]
    pub fn thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Enable or disable reduced motion (builder pattern).
    #[must_use]
    pub fn reduced_motion(mut self, on: bool) -> Self {
        self.reduced_motion = on;
        self
    }

    /// Fade-in duration after reduced motion is applied.
    #[must_use]
    pub fn effective_fade_in(&self) -> Duration {
        if self.reduced_motion {
            Duration::ZERO
        } else {
            self.fade_in
        }
    }

    /// Fade-out duration after reduced motion is applied.
    #[must_use]
    pub fn effective_fade_out(&self) -> Duration {
        if self.reduced_motion {
            Duration::ZERO
        } else {
            self.fade_out
        }
    }
}

// ---------------------------------------------------------------------------
// State, events, effects
// ---------------------------------------------------------------------------

/// Lifecycle phase of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MountPhase {
    /// Nothing fetched.
    #[default]
    Unloaded,
    /// Module fetch in flight (or failed).
    Preloading,
    /// Module loaded, content not shown.
    ReadyHidden,
    /// Fading in.
    Entering,
    /// Fully shown and interactive.
    Visible,
    /// Fading out.
    Exiting,
    /// Content dematerialized; module kept for a fast re-entry.
    UnmountedRetained,
}

/// Named timers a mount machine arms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MountTimer {
    /// Idle fallback.
    IdleTimeout,
    /// Exit debounce.
    UnmountDelay,
    /// Fade-in completion.
    FadeIn,
    /// Fade-out completion.
    FadeOut,
}

impl MountTimer {
    const COUNT: usize = 4;

    const fn index(self) -> usize {
        match self {
            Self::IdleTimeout => 0,
            Self::UnmountDelay => 1,
            Self::FadeIn => 2,
            Self::FadeOut => 3,
        }
    }
}

/// Inputs to the machine.
#[derive(Debug, Clone, PartialEq)]
pub enum MountEvent {
    /// The controller was created.
    Constructed {
        /// Whether the host can observe visibility.
        sensor_available: bool,
        /// Construction time.
        now: Duration,
    },
    /// The host reported an idle period.
    IdleFired {
        /// Current time.
        now: Duration,
    },
    /// The element intersected the root for the first time.
    FirstVisibility,
    /// The sensor crossed the enter threshold.
    Enter {
        /// Current time.
        now: Duration,
    },
    /// The sensor crossed the exit threshold.
    Exit {
        /// Current time.
        now: Duration,
    },
    /// Explicit mount request; also retries a failed fetch.
    Activate {
        /// Current time.
        now: Duration,
    },
    /// Explicit hide request; never debounced.
    Deactivate,
    /// The module fetch succeeded.
    FetchResolved,
    /// The module fetch failed.
    FetchFailed(FetchError),
    /// A timer armed by this machine fired.
    TimerElapsed {
        /// Which timer.
        timer: MountTimer,
        /// Generation it was armed with.
        generation: u64,
        /// Current time.
        now: Duration,
    },
    /// The controller is being torn down.
    Dispose,
}

/// Host-visible notices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MountNotice {
    /// The phase changed.
    PhaseChanged {
        /// Previous phase.
        from: MountPhase,
        /// New phase.
        to: MountPhase,
    },
    /// No sensor; the unit mounts immediately.
    SensorUnavailable,
    /// An Exit arrived inside the flicker window and was deferred.
    ExitDeferred,
    /// A fetch failed (the driver attaches the module path).
    FetchFailed(FetchError),
}

/// Side effects requested by the machine.
#[derive(Debug, Clone, PartialEq)]
pub enum MountEffect {
    /// Fetch the unit's module.
    BeginFetch,
    /// Ask the host for an idle callback.
    RequestIdle,
    /// Arm a timer.
    ArmTimer {
        /// Which timer.
        timer: MountTimer,
        /// Delay from now.
        delay: Duration,
        /// Generation to echo back.
        generation: u64,
    },
    /// Disarm a timer.
    CancelTimer(MountTimer),
    /// Create the unit's content.
    Materialize,
    /// Destroy the unit's content.
    Dematerialize,
    /// Animate the container's opacity and set interactivity.
    SetPresentation {
        /// Target opacity.
        opacity: f64,
        /// Whether the container accepts pointer input.
        interactive: bool,
        /// Animation duration.
        duration: Duration,
    },
    /// Publish a notice.
    Notice(MountNotice),
}

/// Tagged state of one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MountState {
    /// Lifecycle phase.
    pub phase: MountPhase,
    /// Effective mode (may differ from config when degraded).
    pub mode: MountMode,
    /// The unit should be shown.
    pub wanted: bool,
    /// When `wanted` last became true.
    pub wanted_since: Option<Duration>,
    /// A fetch is in flight for this unit.
    pub fetching: bool,
    /// The last fetch failed.
    pub fetch_failed: bool,
    /// The module is loaded.
    pub loaded: bool,
    /// Content currently exists.
    pub materialized: bool,
    /// The unmount-delay timer is armed.
    pub exit_pending: bool,
    /// An Exit was swallowed by the flicker guard since the last Enter.
    pub exit_deferred: bool,
    /// The idle signal (or its fallback) was handled.
    pub idle_handled: bool,
    /// The first-visibility preload trigger was consumed.
    pub first_visibility_seen: bool,
    /// The machine was disposed.
    pub disposed: bool,
    timer_generations: [Generation; MountTimer::COUNT],
}

impl MountState {
    /// Current generation of `timer`.
    #[must_use]
    pub fn timer_generation(&self, timer: MountTimer) -> u64 {
        self.timer_generations[timer.index()].get()
    }

    /// Apply `event`, returning the effects to perform.
    pub fn apply(&mut self, config: &MountConfig, event: MountEvent) -> Vec<MountEffect> {
        let mut step = Step {
            state: self,
            config,
            effects: Vec::new(),
        };
        step.handle(event);
        step.effects
    }
}

/// Pure form of [`MountState::apply`].
#[must_use]
pub fn transition(
    state: MountState,
    config: &MountConfig,
    event: MountEvent,
) -> (MountState, Vec<MountEffect>) {
    let mut next = state;
    let effects = next.apply(config, event);
    (next, effects)
}

// ---------------------------------------------------------------------------
// Transition logic
// ---------------------------------------------------------------------------

struct Step<'a> {
    state: &'a mut MountState,
    config: &'a MountConfig,
    effects: Vec<MountEffect>,
}

impl Step<'_> {
    fn handle(&mut self, event: MountEvent) {
        if self.state.disposed {
            tracing::trace!(target: "vista.mount", ?event, "event after dispose ignored");
            return;
        }
        match event {
            MountEvent::Constructed {
                sensor_available,
                now,
            } => self.constructed(sensor_available, now),
            MountEvent::IdleFired { now } => self.idle(now),
            MountEvent::FirstVisibility => self.first_visibility(),
            MountEvent::Enter { now } => {
                self.cancel_exit();
                self.want(now);
                self.show();
            }
            MountEvent::Exit { now } => self.exit(now),
            MountEvent::Activate { now } => self.activate(now),
            MountEvent::Deactivate => {
                self.cancel_exit();
                self.state.wanted = false;
                self.state.wanted_since = None;
                self.hide();
            }
            MountEvent::FetchResolved => self.fetch_resolved(),
            MountEvent::FetchFailed(err) => self.fetch_failed(err),
            MountEvent::TimerElapsed {
                timer,
                generation,
                now,
            } => self.timer(timer, generation, now),
            MountEvent::Dispose => {
                self.state.disposed = true;
                tracing::debug!(target: "vista.mount", phase = ?self.state.phase, "disposed");
            }
        }
    }

    fn constructed(&mut self, sensor_available: bool, now: Duration) {
        let mut mode = self.config.mode;
        if !sensor_available && mode == MountMode::VisibilityDriven {
            mode = MountMode::Immediate;
            self.effects.push(MountEffect::Notice(MountNotice::SensorUnavailable));
            tracing::debug!(target: "vista.mount", "no sensor, mounting immediately");
        }
        self.state.mode = mode;
        match mode {
            MountMode::Immediate => {
                self.want(now);
                self.show();
            }
            MountMode::Idle => self.request_idle(),
            MountMode::VisibilityDriven if self.config.preload_on_idle => self.request_idle(),
            MountMode::VisibilityDriven => {}
        }
    }

    fn request_idle(&mut self) {
        self.effects.push(MountEffect::RequestIdle);
        self.arm(MountTimer::IdleTimeout, self.config.idle_timeout);
    }

    fn idle(&mut self, now: Duration) {
        if self.state.idle_handled {
            return;
        }
        self.state.idle_handled = true;
        self.cancel(MountTimer::IdleTimeout);
        if self.state.mode == MountMode::Idle {
            self.want(now);
            self.show();
        } else if self.config.preload_on_idle {
            self.preload();
        }
    }

    fn first_visibility(&mut self) {
        if self.state.first_visibility_seen {
            return;
        }
        self.state.first_visibility_seen = true;
        if self.config.preload_on_first_visibility {
            self.preload();
        }
    }

    fn exit(&mut self, now: Duration) {
        if !self.state.wanted {
            return;
        }
        let inside_window = self
            .state
            .wanted_since
            .is_some_and(|since| now < since.saturating_add(self.config.unmount_delay));
        if inside_window {
            if !self.state.exit_deferred {
                self.state.exit_deferred = true;
                self.effects.push(MountEffect::Notice(MountNotice::ExitDeferred));
                tracing::debug!(target: "vista.mount", "exit deferred by flicker guard");
            }
            return;
        }
        self.state.exit_deferred = false;
        self.state.wanted = false;
        self.state.wanted_since = None;
        self.state.exit_pending = true;
        self.arm(MountTimer::UnmountDelay, self.config.unmount_delay);
    }

    fn activate(&mut self, now: Duration) {
        self.cancel_exit();
        self.want(now);
        if self.state.phase == MountPhase::Preloading && self.state.fetch_failed {
            self.state.fetch_failed = false;
            self.begin_fetch();
        } else {
            self.show();
        }
    }

    fn fetch_resolved(&mut self) {
        if !self.state.fetching {
            return;
        }
        self.state.fetching = false;
        self.state.fetch_failed = false;
        self.state.loaded = true;
        if self.state.phase == MountPhase::Preloading {
            if self.state.wanted {
                self.fade_in();
            } else {
                self.set_phase(MountPhase::ReadyHidden);
            }
        }
    }

    fn fetch_failed(&mut self, err: FetchError) {
        if !self.state.fetching {
            return;
        }
        self.state.fetching = false;
        self.state.fetch_failed = true;
        self.effects.push(MountEffect::Notice(MountNotice::FetchFailed(err)));
    }

    fn timer(&mut self, timer: MountTimer, generation: u64, now: Duration) {
        if !self.state.timer_generations[timer.index()].is_current(generation) {
            tracing::trace!(target: "vista.mount", ?timer, generation, "stale timer ignored");
            return;
        }
        match timer {
            MountTimer::IdleTimeout => self.idle(now),
            MountTimer::UnmountDelay => {
                if !self.state.exit_pending {
                    return;
                }
                self.state.exit_pending = false;
                if !self.state.wanted {
                    self.hide();
                }
            }
            MountTimer::FadeIn => {
                if self.state.phase == MountPhase::Entering {
                    self.set_phase(MountPhase::Visible);
                    self.effects.push(MountEffect::SetPresentation {
                        opacity: 1.0,
                        interactive: true,
                        duration: Duration::ZERO,
                    });
                }
            }
            MountTimer::FadeOut => {
                if self.state.phase == MountPhase::Exiting {
                    self.set_phase(MountPhase::UnmountedRetained);
                    self.state.materialized = false;
                    self.effects.push(MountEffect::Dematerialize);
                }
            }
        }
    }

    // -- helpers ------------------------------------------------------------

    fn want(&mut self, now: Duration) {
        if !self.state.wanted {
            self.state.wanted = true;
            self.state.wanted_since = Some(now);
        }
    }

    fn cancel_exit(&mut self) {
        self.state.exit_deferred = false;
        if self.state.exit_pending {
            self.state.exit_pending = false;
            self.cancel(MountTimer::UnmountDelay);
        }
    }

    fn show(&mut self) {
        match self.state.phase {
            MountPhase::Unloaded => self.begin_fetch(),
            MountPhase::ReadyHidden | MountPhase::UnmountedRetained => self.fade_in(),
            MountPhase::Exiting => {
                self.cancel(MountTimer::FadeOut);
                self.fade_in();
            }
            MountPhase::Preloading | MountPhase::Entering | MountPhase::Visible => {}
        }
    }

    fn hide(&mut self) {
        match self.state.phase {
            MountPhase::Entering => {
                self.cancel(MountTimer::FadeIn);
                self.fade_out();
            }
            MountPhase::Visible => self.fade_out(),
            _ => {}
        }
    }

    fn preload(&mut self) {
        if self.state.phase == MountPhase::Unloaded {
            self.begin_fetch();
        }
    }

    fn begin_fetch(&mut self) {
        if self.state.fetching {
            return;
        }
        self.state.fetching = true;
        if self.state.phase != MountPhase::Preloading {
            self.set_phase(MountPhase::Preloading);
        }
        self.effects.push(MountEffect::BeginFetch);
    }

    fn fade_in(&mut self) {
        if !self.state.materialized {
            self.state.materialized = true;
            self.effects.push(MountEffect::Materialize);
        }
        self.set_phase(MountPhase::Entering);
        let duration = self.config.effective_fade_in();
        self.effects.push(MountEffect::SetPresentation {
            opacity: 1.0,
            interactive: false,
            duration,
        });
        self.arm(MountTimer::FadeIn, duration);
    }

    fn fade_out(&mut self) {
        self.set_phase(MountPhase::Exiting);
        let duration = self.config.effective_fade_out();
        self.effects.push(MountEffect::SetPresentation {
            opacity: 0.0,
            interactive: false,
            duration,
        });
        self.arm(MountTimer::FadeOut, duration);
    }

    fn set_phase(&mut self, to: MountPhase) {
        let from = self.state.phase;
        if from == to {
            return;
        }
        self.state.phase = to;
        tracing::debug!(target: "vista.mount", ?from, ?to, "phase change");
        self.effects
            .push(MountEffect::Notice(MountNotice::PhaseChanged { from, to }));
    }

    fn arm(&mut self, timer: MountTimer, delay: Duration) {
        let generation = self.state.timer_generations[timer.index()].bump();
        self.effects.push(MountEffect::ArmTimer {
            timer,
            delay,
            generation,
        });
    }

    fn cancel(&mut self, timer: MountTimer) {
        self.state.timer_generations[timer.index()].bump();
        self.effects.push(MountEffect::CancelTimer(timer));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn visibility_driven() -> MountConfig {
        MountConfig::default().preload_on_first_visibility(false)
    }

    /// Drive a machine and fire timers by hand.
    struct Harness {
        state: MountState,
        config: MountConfig,
        now: Duration,
        armed: Vec<(MountTimer, Duration, u64)>,
        log: Vec<MountEffect>,
    }

    impl Harness {
        fn new(config: MountConfig, sensor: bool) -> Self {
            let mut h = Self {
                state: MountState::default(),
                config,
                now: Duration::ZERO,
                armed: Vec::new(),
                log: Vec::new(),
            };
            h.send(MountEvent::Constructed {
                sensor_available: sensor,
                now: ms(0),
            });
            h
        }

        fn send(&mut self, event: MountEvent) -> Vec<MountEffect> {
            match &event {
                MountEvent::Constructed { now, .. }
                | MountEvent::IdleFired { now }
                | MountEvent::Enter { now }
                | MountEvent::Exit { now }
                | MountEvent::Activate { now }
                | MountEvent::TimerElapsed { now, .. } => self.now = *now,
                _ => {}
            }
            let fx = self.state.apply(&self.config, event);
            for e in &fx {
                match e {
                    MountEffect::ArmTimer {
                        timer,
                        delay,
                        generation,
                    } => {
                        self.armed.retain(|(t, _, _)| t != timer);
                        self.armed.push((*timer, self.now + *delay, *generation));
                    }
                    MountEffect::CancelTimer(timer) => self.armed.retain(|(t, _, _)| t != timer),
                    _ => {}
                }
            }
            self.log.extend(fx.iter().cloned());
            fx
        }

        /// Fire every armed timer due at or before `now`, in order.
        fn advance(&mut self, now: Duration) {
            loop {
                self.armed.sort_by_key(|(_, at, _)| *at);
                let Some(pos) = self.armed.iter().position(|(_, at, _)| *at <= now) else {
                    break;
                };
                let (timer, at, generation) = self.armed.remove(pos);
                self.send(MountEvent::TimerElapsed {
                    timer,
                    generation,
                    now: at,
                });
            }
            self.now = now;
        }

        fn fetches(&self) -> usize {
            self.log
                .iter()
                .filter(|e| matches!(e, MountEffect::BeginFetch))
                .count()
        }

        fn fade_outs(&self) -> usize {
            self.log
                .iter()
                .filter(|e| {
                    matches!(e, MountEffect::SetPresentation { opacity, .. } if *opacity == 0.0)
                })
                .count()
        }
    }

    #[test]
    fn enter_fetches_then_fades_in() {
        let mut h = Harness::new(visibility_driven(), true);
        assert_eq!(h.state.phase, MountPhase::Unloaded);
        h.send(MountEvent::Enter { now: ms(0) });
        assert_eq!(h.state.phase, MountPhase::Preloading);
        h.send(MountEvent::FetchResolved);
        assert_eq!(h.state.phase, MountPhase::Entering);
        assert!(h.log.contains(&MountEffect::Materialize));
        h.advance(ms(300));
        assert_eq!(h.state.phase, MountPhase::Visible);
    }

    #[test]
    fn scenario_d_exit_inside_window_never_fades() {
        let mut h = Harness::new(visibility_driven(), true);
        h.send(MountEvent::Enter { now: ms(0) });
        h.send(MountEvent::FetchResolved);
        h.send(MountEvent::Exit { now: ms(50) });
        assert!(h.state.exit_deferred);
        h.advance(ms(5_000));
        assert_eq!(h.state.phase, MountPhase::Visible);
        assert_eq!(h.fade_outs(), 0);
    }

    #[test]
    fn exit_then_reenter_within_delay_cancels() {
        let mut h = Harness::new(visibility_driven(), true);
        h.send(MountEvent::Enter { now: ms(0) });
        h.send(MountEvent::FetchResolved);
        h.advance(ms(400));
        h.send(MountEvent::Exit { now: ms(1_000) });
        assert!(h.state.exit_pending);
        h.send(MountEvent::Enter { now: ms(1_050) });
        assert!(!h.state.exit_pending);
        assert_eq!(h.state.phase, MountPhase::Visible);
        assert_eq!(h.fade_outs(), 0);
        assert_eq!(h.fetches(), 1);
    }

    #[test]
    fn exit_after_delay_fades_out_and_retains() {
        let mut h = Harness::new(visibility_driven(), true);
        h.send(MountEvent::Enter { now: ms(0) });
        h.send(MountEvent::FetchResolved);
        h.advance(ms(400));
        let fx = h.send(MountEvent::Exit { now: ms(1_000) });
        let Some(MountEffect::ArmTimer { generation, .. }) = fx.first().cloned() else {
            panic!("exit must arm the unmount delay: {fx:?}");
        };
        h.send(MountEvent::TimerElapsed {
            timer: MountTimer::UnmountDelay,
            generation,
            now: ms(1_150),
        });
        assert_eq!(h.state.phase, MountPhase::Exiting);
        let generation = h.state.timer_generation(MountTimer::FadeOut);
        h.send(MountEvent::TimerElapsed {
            timer: MountTimer::FadeOut,
            generation,
            now: ms(1_350),
        });
        assert_eq!(h.state.phase, MountPhase::UnmountedRetained);
        assert!(h.log.contains(&MountEffect::Dematerialize));

        // Re-entry needs no fetch.
        h.send(MountEvent::Enter { now: ms(2_000) });
        assert_eq!(h.state.phase, MountPhase::Entering);
        assert_eq!(h.fetches(), 1);
    }

    #[test]
    fn enter_during_fade_out_reverses() {
        let mut h = Harness::new(visibility_driven(), true);
        h.send(MountEvent::Enter { now: ms(0) });
        h.send(MountEvent::FetchResolved);
        h.advance(ms(400));
        h.send(MountEvent::Deactivate);
        assert_eq!(h.state.phase, MountPhase::Exiting);
        let stale = h.state.timer_generation(MountTimer::FadeOut);
        h.send(MountEvent::Enter { now: ms(500) });
        assert_eq!(h.state.phase, MountPhase::Entering);
        h.send(MountEvent::TimerElapsed {
            timer: MountTimer::FadeOut,
            generation: stale,
            now: ms(700),
        });
        assert_eq!(h.state.phase, MountPhase::Entering, "stale fade-out ignored");
    }

    #[test]
    fn deactivate_is_never_deferred() {
        let mut h = Harness::new(visibility_driven(), true);
        h.send(MountEvent::Enter { now: ms(0) });
        h.send(MountEvent::FetchResolved);
        h.send(MountEvent::Deactivate);
        assert_eq!(h.state.phase, MountPhase::Exiting);
    }

    #[test]
    fn repeated_enter_while_preloading_fetches_once() {
        let mut h = Harness::new(visibility_driven(), true);
        for t in 0..5 {
            h.send(MountEvent::Enter { now: ms(t * 10) });
            h.send(MountEvent::Activate { now: ms(t * 10) });
        }
        assert_eq!(h.fetches(), 1);
    }

    #[test]
    fn fetch_failure_waits_for_activate() {
        let mut h = Harness::new(visibility_driven(), true);
        h.send(MountEvent::Enter { now: ms(0) });
        let fx = h.send(MountEvent::FetchFailed(FetchError::Failed("boom".into())));
        assert_eq!(
            fx,
            vec![MountEffect::Notice(MountNotice::FetchFailed(FetchError::Failed(
                "boom".into()
            )))]
        );
        assert_eq!(h.state.phase, MountPhase::Preloading);
        h.send(MountEvent::Enter { now: ms(500) });
        assert_eq!(h.fetches(), 1, "no automatic retry");
        h.send(MountEvent::Activate { now: ms(600) });
        assert_eq!(h.fetches(), 2);
        h.send(MountEvent::FetchResolved);
        assert_eq!(h.state.phase, MountPhase::Entering);
    }

    #[test]
    fn missing_sensor_degrades_to_immediate() {
        let h = Harness::new(visibility_driven(), false);
        assert_eq!(h.state.mode, MountMode::Immediate);
        assert_eq!(h.state.phase, MountPhase::Preloading);
        assert!(h
            .log
            .contains(&MountEffect::Notice(MountNotice::SensorUnavailable)));
    }

    #[test]
    fn idle_mode_mounts_on_first_idle_only() {
        let mut h = Harness::new(MountConfig::default().mode(MountMode::Idle), true);
        assert!(h.log.contains(&MountEffect::RequestIdle));
        assert_eq!(h.state.phase, MountPhase::Unloaded);
        h.send(MountEvent::IdleFired { now: ms(40) });
        h.send(MountEvent::IdleFired { now: ms(80) });
        assert_eq!(h.state.phase, MountPhase::Preloading);
        assert_eq!(h.fetches(), 1);
        assert!(!h.armed.iter().any(|(t, _, _)| *t == MountTimer::IdleTimeout));
    }

    #[test]
    fn idle_timeout_is_fallback() {
        let mut h = Harness::new(MountConfig::default().mode(MountMode::Idle), true);
        h.advance(ms(2_000));
        assert_eq!(h.state.phase, MountPhase::Preloading);
        assert!(h.state.idle_handled);
    }

    #[test]
    fn preload_on_idle_keeps_unit_hidden() {
        let config = visibility_driven().preload_on_idle(true);
        let mut h = Harness::new(config, true);
        h.send(MountEvent::IdleFired { now: ms(10) });
        h.send(MountEvent::FetchResolved);
        assert_eq!(h.state.phase, MountPhase::ReadyHidden);
        h.send(MountEvent::Enter { now: ms(900) });
        assert_eq!(h.state.phase, MountPhase::Entering);
        assert_eq!(h.fetches(), 1);
    }

    #[test]
    fn first_visibility_preloads_once() {
        let mut h = Harness::new(MountConfig::default(), true);
        h.send(MountEvent::FirstVisibility);
        h.send(MountEvent::FirstVisibility);
        assert_eq!(h.fetches(), 1);
        assert!(!h.state.wanted);
    }

    #[test]
    fn reduced_motion_uses_zero_fades() {
        let mut h = Harness::new(visibility_driven().reduced_motion(true), true);
        h.send(MountEvent::Enter { now: ms(0) });
        let fx = h.send(MountEvent::FetchResolved);
        assert!(fx.contains(&MountEffect::SetPresentation {
            opacity: 1.0,
            interactive: false,
            duration: Duration::ZERO,
        }));
        h.advance(ms(0));
        assert_eq!(h.state.phase, MountPhase::Visible);
    }

    #[test]
    fn disposed_machine_ignores_events() {
        let mut h = Harness::new(visibility_driven(), true);
        h.send(MountEvent::Dispose);
        assert!(h.send(MountEvent::Enter { now: ms(0) }).is_empty());
        assert_eq!(h.state.phase, MountPhase::Unloaded);
    }

    #[test]
    fn transition_is_pure() {
        let config = visibility_driven();
        let before = MountState::default();
        let (after, fx) = transition(before, &config, MountEvent::Enter { now: ms(0) });
        assert_eq!(before.phase, MountPhase::Unloaded);
        assert_eq!(after.phase, MountPhase::Preloading);
        assert!(fx.contains(&MountEffect::BeginFetch));
    }
}
