#![forbid(unsafe_code)]

//! Driver for one [`MountState`] machine.
//!
//! The [`MountController`] owns everything the pure machine must not: the
//! visibility sensor, the armed timers and the fade animation item. Host
//! calls are translated into [`MountEvent`]s, the resulting effects are
//! performed, and any work that needs the session (fetches, idle requests)
//! is returned as [`MountCommand`]s.
//!
//! Every public method that takes `now` first fires the timers due by
//! `now`, so a host that only calls `advance` on frames still sees timers
//! fire in deadline order.

use std::time::Duration;

use vista_core::animation::{AnimationItem, Fade, Immediate};
use vista_core::geometry::Rect;
use vista_layout::{ElementId, VisibilitySensor};

use crate::error::{FetchError, MountError};
use crate::module_cache::ModulePath;
use crate::mount::{
    MountConfig, MountEffect, MountEvent, MountNotice, MountPhase, MountState, MountTimer,
};
use crate::timer::TimerQueue;

/// Work the controller needs from its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MountCommand {
    /// Make sure the module is loaded, then call
    /// [`fetch_settled`](MountController::fetch_settled).
    Fetch(ModulePath),
    /// Deliver an idle callback via [`idle`](MountController::idle).
    RequestIdle,
}

/// What the host renders for the unit's container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Presentation {
    /// Current container opacity.
    pub opacity: f64,
    /// Whether the container accepts pointer input.
    pub interactive: bool,
    /// Whether the heavy content exists.
    pub materialized: bool,
    /// Keep a placeholder height while the content is absent.
    pub reserve_space: bool,
}

/// Drives one lazily mounted content unit.
#[derive(Debug)]
pub struct MountController {
    module: ModulePath,
    config: MountConfig,
    state: MountState,
    observation_supported: bool,
    sensor: Option<VisibilitySensor>,
    timers: TimerQueue<MountTimer>,
    fade: Box<dyn AnimationItem>,
    interactive: bool,
    last_now: Duration,
    queued: Vec<MountCommand>,
    notices: Vec<MountNotice>,
}

impl MountController {
    /// Create a controller. Call [`start`](Self::start) once to run the
    /// construction transition.
    #[must_use]
    pub fn new(module: ModulePath, config: MountConfig, observation_supported: bool) -> Self {
        let fade: Box<dyn AnimationItem> = if config.reduced_motion {
            Box::new(Immediate::new(0.0))
        } else {
            Box::new(Fade::new(0.0))
        };
        Self {
            module,
            config,
            state: MountState::default(),
            observation_supported,
            sensor: None,
            timers: TimerQueue::new(),
            fade,
            interactive: false,
            last_now: Duration::ZERO,
            queued: Vec::new(),
            notices: Vec::new(),
        }
    }

    /// Replace the fade item (builder pattern).
    #[must_use]
    pub fn with_animation(mut self, item: Box<dyn AnimationItem>) -> Self {
        self.fade = item;
        self
    }

    /// Run the construction transition.
    pub fn start(&mut self, now: Duration) -> Vec<MountCommand> {
        self.last_now = now;
        self.dispatch(
            MountEvent::Constructed {
                sensor_available: self.observation_supported,
                now,
            },
            now,
        )
    }

    /// Start observing the unit's element. Replaces any previous sensor.
    pub fn attach(&mut self, element: ElementId) {
        if self.state.disposed {
            return;
        }
        self.detach();
        match VisibilitySensor::observe(
            element,
            self.config.thresholds.clone(),
            self.observation_supported,
        ) {
            Ok(sensor) => self.sensor = Some(sensor),
            Err(e) => {
                tracing::debug!(target: "vista.mount", module = %self.module, error = %e, "sensor not attached");
            }
        }
    }

    /// Stop observing the unit's element.
    pub fn detach(&mut self) {
        if let Some(mut sensor) = self.sensor.take() {
            sensor.unobserve();
        }
    }

    /// Feed a fresh measurement of the element against the scroll root.
    pub fn observe(&mut self, element: &Rect, root: &Rect, now: Duration) -> Vec<MountCommand> {
        let mut cmds = self.sync(now);
        let Some(sensor) = self.sensor.as_mut() else {
            return cmds;
        };
        if let Some(report) = sensor.measure(element, root) {
            if report.is_intersecting && !self.state.first_visibility_seen {
                self.apply(MountEvent::FirstVisibility, now, &mut cmds);
            }
            if report.crossed_enter {
                self.apply(MountEvent::Enter { now }, now, &mut cmds);
            } else if report.crossed_exit {
                self.apply(MountEvent::Exit { now }, now, &mut cmds);
            }
        }
        self.fire_due(now, &mut cmds);
        cmds
    }

    /// Deliver an idle callback.
    pub fn idle(&mut self, now: Duration) -> Vec<MountCommand> {
        let mut cmds = self.sync(now);
        self.apply(MountEvent::IdleFired { now }, now, &mut cmds);
        self.fire_due(now, &mut cmds);
        cmds
    }

    /// Advance time: tick the fade and fire due timers.
    pub fn advance(&mut self, now: Duration) -> Vec<MountCommand> {
        self.sync(now)
    }

    /// Explicitly mount the unit, retrying a failed fetch.
    pub fn activate(&mut self, now: Duration) -> Result<Vec<MountCommand>, MountError> {
        if self.state.disposed {
            return Err(MountError::Disposed);
        }
        Ok(self.dispatch(MountEvent::Activate { now }, now))
    }

    /// Explicitly hide the unit. Never debounced.
    pub fn deactivate(&mut self, now: Duration) -> Vec<MountCommand> {
        self.dispatch(MountEvent::Deactivate, now)
    }

    /// Report the outcome of this unit's module fetch.
    ///
    /// A failure is applied to the machine (the unit stays `Preloading`) and
    /// returned as [`MountError::FetchFailed`]; commands raised by timers
    /// that fell due meanwhile are held for the next call. Outcomes that
    /// arrive after teardown, or while the unit is not waiting for a fetch,
    /// are dropped without an error.
    pub fn fetch_settled(
        &mut self,
        outcome: Result<(), FetchError>,
        now: Duration,
    ) -> Result<Vec<MountCommand>, MountError> {
        if !self.is_awaiting_fetch() {
            tracing::trace!(target: "vista.mount", module = %self.module, "late fetch outcome ignored");
            return Ok(self.advance(now));
        }
        match outcome {
            Ok(()) => Ok(self.dispatch(MountEvent::FetchResolved, now)),
            Err(source) => {
                let cmds = self.dispatch(MountEvent::FetchFailed(source.clone()), now);
                self.queued.extend(cmds);
                tracing::warn!(target: "vista.mount", module = %self.module, error = %source, "fetch failed");
                Err(MountError::FetchFailed {
                    path: self.module.clone(),
                    source,
                })
            }
        }
    }

    /// Dispose the sensor, timers and animation. Later calls are no-ops.
    pub fn teardown(&mut self) {
        if self.state.disposed {
            return;
        }
        let mut cmds = Vec::new();
        self.apply(MountEvent::Dispose, self.last_now, &mut cmds);
        self.timers.clear();
        self.queued.clear();
        self.detach();
        self.fade.dispose();
        self.interactive = false;
    }

    // -- queries ------------------------------------------------------------

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> MountPhase {
        self.state.phase
    }

    /// Full machine state.
    #[must_use]
    pub fn state(&self) -> &MountState {
        &self.state
    }

    /// Module this unit loads.
    #[must_use]
    pub fn module(&self) -> &ModulePath {
        &self.module
    }

    /// Whether the unit waits for a fetch outcome.
    #[must_use]
    pub fn is_awaiting_fetch(&self) -> bool {
        self.state.fetching && !self.state.disposed
    }

    /// Whether the heavy content currently exists.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.state.materialized && !self.state.disposed
    }

    /// Whether a sensor is attached.
    #[must_use]
    pub fn is_observing(&self) -> bool {
        self.sensor.as_ref().is_some_and(VisibilitySensor::is_active)
    }

    /// Current presentation.
    #[must_use]
    pub fn presentation(&self) -> Presentation {
        let materialized = self.is_alive();
        Presentation {
            opacity: self.fade.value(),
            interactive: self.interactive && materialized,
            materialized,
            reserve_space: !materialized,
        }
    }

    /// Earliest armed timer deadline.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.next_deadline()
    }

    /// Take pending notices.
    pub fn drain_notices(&mut self) -> Vec<MountNotice> {
        std::mem::take(&mut self.notices)
    }

    // -- internals ----------------------------------------------------------

    fn dispatch(&mut self, event: MountEvent, now: Duration) -> Vec<MountCommand> {
        let mut cmds = self.sync(now);
        self.apply(event, now, &mut cmds);
        self.fire_due(now, &mut cmds);
        cmds
    }

    /// Tick the fade up to `now` and fire timers that are due.
    fn sync(&mut self, now: Duration) -> Vec<MountCommand> {
        let dt = now.saturating_sub(self.last_now);
        self.last_now = self.last_now.max(now);
        self.fade.tick(dt);
        let mut cmds = std::mem::take(&mut self.queued);
        self.fire_due(now, &mut cmds);
        cmds
    }

    fn fire_due(&mut self, now: Duration, cmds: &mut Vec<MountCommand>) {
        while let Some(fired) = self.timers.pop_due(now) {
            self.apply(
                MountEvent::TimerElapsed {
                    timer: fired.kind,
                    generation: fired.generation,
                    now: fired.at,
                },
                fired.at,
                cmds,
            );
        }
    }

    fn apply(&mut self, event: MountEvent, now: Duration, cmds: &mut Vec<MountCommand>) {
        let _span = tracing::debug_span!("mount.transition", module = %self.module).entered();
        for effect in self.state.apply(&self.config, event) {
            match effect {
                MountEffect::BeginFetch => cmds.push(MountCommand::Fetch(self.module.clone())),
                MountEffect::RequestIdle => cmds.push(MountCommand::RequestIdle),
                MountEffect::ArmTimer {
                    timer,
                    delay,
                    generation,
                } => self.timers.schedule(timer, now.saturating_add(delay), generation),
                MountEffect::CancelTimer(timer) => {
                    self.timers.cancel(timer);
                }
                MountEffect::Materialize => {
                    tracing::debug!(target: "vista.mount", module = %self.module, "materialize");
                }
                MountEffect::Dematerialize => {
                    self.fade.seek(0.0);
                    tracing::debug!(target: "vista.mount", module = %self.module, "dematerialize");
                }
                MountEffect::SetPresentation {
                    opacity,
                    interactive,
                    duration,
                } => {
                    self.interactive = interactive;
                    let from = self.fade.value();
                    self.fade.play_range(from, opacity, duration);
                    self.fade.tick(Duration::ZERO);
                }
                MountEffect::Notice(notice) => self.notices.push(notice),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mount::MountMode;

    const fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    const ROOT: Rect = Rect {
        x: 0.0,
        y: 0.0,
        width: 800.0,
        height: 600.0,
    };

    fn at(top: f64) -> Rect {
        Rect::new(0.0, top, 800.0, 400.0)
    }

    fn controller(config: MountConfig) -> MountController {
        let mut c = MountController::new(ModulePath::new("units/game"), config, true);
        let cmds = c.start(ms(0));
        assert!(cmds.is_empty(), "{cmds:?}");
        c.attach(ElementId(1));
        c
    }

    fn config() -> MountConfig {
        MountConfig::default().preload_on_first_visibility(false)
    }

    #[test]
    fn visible_after_enter_fetch_and_fade() {
        let mut c = controller(config());
        let cmds = c.observe(&at(100.0), &ROOT, ms(0));
        assert_eq!(cmds, vec![MountCommand::Fetch(ModulePath::new("units/game"))]);
        assert!(c.presentation().reserve_space);

        c.fetch_settled(Ok(()), ms(20)).unwrap();
        assert_eq!(c.phase(), MountPhase::Entering);
        assert!(c.presentation().materialized);
        assert!(!c.presentation().interactive);

        c.advance(ms(170));
        let mid = c.presentation().opacity;
        assert!(mid > 0.0 && mid < 1.0, "mid-fade opacity {mid}");

        c.advance(ms(320));
        assert_eq!(c.phase(), MountPhase::Visible);
        let p = c.presentation();
        assert_eq!(p.opacity, 1.0);
        assert!(p.interactive);
        assert!(!p.reserve_space);
    }

    #[test]
    fn deferred_exit_is_dropped_while_still_outside() {
        let mut c = controller(config());
        c.observe(&at(100.0), &ROOT, ms(0));
        c.fetch_settled(Ok(()), ms(0)).unwrap();
        c.observe(&at(900.0), &ROOT, ms(50));
        assert!(c.state().exit_deferred);

        // Later measurements at the same level carry no new exit edge.
        for t in (66..1_000).step_by(16) {
            assert!(c.observe(&at(905.0), &ROOT, ms(t)).is_empty());
        }
        assert_eq!(c.phase(), MountPhase::Visible);
        assert!(!c.state().exit_pending);
        assert!(c.is_alive());
    }

    #[test]
    fn fresh_exit_edge_after_reentry_unmounts() {
        let mut c = controller(config());
        c.observe(&at(100.0), &ROOT, ms(0));
        c.fetch_settled(Ok(()), ms(0)).unwrap();
        c.observe(&at(900.0), &ROOT, ms(50));
        c.observe(&at(100.0), &ROOT, ms(400));
        assert!(!c.state().exit_deferred);

        c.observe(&at(900.0), &ROOT, ms(1_000));
        assert!(c.state().exit_pending);
        c.advance(ms(1_150));
        assert_eq!(c.phase(), MountPhase::Exiting);
        c.advance(ms(1_350));
        assert_eq!(c.phase(), MountPhase::UnmountedRetained);
        assert!(!c.is_alive());
    }

    #[test]
    fn fetch_failure_reports_error() {
        let mut c = controller(config());
        c.observe(&at(100.0), &ROOT, ms(0));
        let err = c
            .fetch_settled(Err(FetchError::Failed("offline".into())), ms(10))
            .unwrap_err();
        assert_eq!(
            err,
            MountError::FetchFailed {
                path: ModulePath::new("units/game"),
                source: FetchError::Failed("offline".into()),
            }
        );
        assert_eq!(c.phase(), MountPhase::Preloading);
        let retry = c.activate(ms(20)).unwrap();
        assert_eq!(retry, vec![MountCommand::Fetch(ModulePath::new("units/game"))]);
    }

    #[test]
    fn no_sensor_mounts_immediately() {
        let mut c = MountController::new(ModulePath::new("units/scoop"), config(), false);
        let cmds = c.start(ms(0));
        assert_eq!(cmds, vec![MountCommand::Fetch(ModulePath::new("units/scoop"))]);
        c.attach(ElementId(3));
        assert!(!c.is_observing());
        assert!(c
            .drain_notices()
            .contains(&MountNotice::SensorUnavailable));
    }

    #[test]
    fn idle_mode_requests_idle() {
        let mut c = MountController::new(
            ModulePath::new("units/rotary"),
            config().mode(MountMode::Idle),
            true,
        );
        assert_eq!(c.start(ms(0)), vec![MountCommand::RequestIdle]);
        assert_eq!(c.next_deadline(), Some(ms(2_000)));
        let cmds = c.advance(ms(2_000));
        assert_eq!(cmds, vec![MountCommand::Fetch(ModulePath::new("units/rotary"))]);
    }

    #[test]
    fn reduced_motion_is_instant() {
        let mut c = controller(config().reduced_motion(true));
        c.observe(&at(100.0), &ROOT, ms(0));
        c.fetch_settled(Ok(()), ms(0)).unwrap();
        assert_eq!(c.phase(), MountPhase::Visible);
        assert_eq!(c.presentation().opacity, 1.0);
    }

    #[test]
    fn teardown_ignores_late_callbacks() {
        let mut c = controller(config());
        c.observe(&at(100.0), &ROOT, ms(0));
        c.teardown();
        assert!(c.fetch_settled(Ok(()), ms(10)).unwrap().is_empty());
        assert_eq!(c.phase(), MountPhase::Preloading);
        assert!(!c.is_observing());
        assert_eq!(c.activate(ms(20)), Err(MountError::Disposed));
        assert!(c.observe(&at(0.0), &ROOT, ms(30)).is_empty());
    }

    #[test]
    fn late_failure_is_not_reported_as_live_error() {
        let mut c = controller(config());
        c.observe(&at(100.0), &ROOT, ms(0));
        c.teardown();
        let late = c.fetch_settled(Err(FetchError::Failed("offline".into())), ms(10));
        assert_eq!(late, Ok(Vec::new()));
        assert!(c.drain_notices().iter().all(|n| !matches!(n, MountNotice::FetchFailed(_))));
    }

    #[test]
    fn failure_without_fetch_in_flight_is_ignored() {
        let mut c = controller(config());
        let outcome = c.fetch_settled(Err(FetchError::Failed("stray".into())), ms(5));
        assert_eq!(outcome, Ok(Vec::new()));
        assert_eq!(c.phase(), MountPhase::Unloaded);
        assert!(!c.state().fetch_failed);
    }
}
