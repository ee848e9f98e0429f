#![forbid(unsafe_code)]

//! Session context: one registry, one module cache, one focus controller.
//!
//! A [`Session`] owns every piece of orchestrator state whose lifetime is
//! the page visit. It fans host signals (scroll, layout, frames, input,
//! idle callbacks, fetch completions) out to the mount controllers and the
//! focus controller, and routes the fetches they ask for through the
//! session-scoped [`ModuleCache`] so each module path is loaded once.
//!
//! # Invariants
//!
//! 1. Pane order and keys are frozen at construction.
//! 2. The first pane's unit mounts eagerly; every other unit uses the
//!    configured mount mode.
//! 3. A settled fetch reaches every unit waiting on that module path, and
//!    only while its ticket is current.
//! 4. After [`teardown`](Session::teardown), mutating calls return
//!    [`SessionError::TornDown`] or do nothing, and late fetch completions
//!    are ignored.

use std::collections::VecDeque;
use std::time::Duration;

use vista_core::event::InputEvent;
use vista_layout::{ElementId, PaneKey, PaneRegistry, RegistryError};

use crate::config::OrchestratorConfig;
use crate::error::{FetchError, MountError, SessionError};
use crate::focus::FocusNotice;
use crate::focus_driver::{FocusController, FocusSnapshot};
use crate::module_cache::{Ensure, FetchTicket, Loader, ModuleCache, ModulePath, ModuleStatus};
use crate::mount::{MountMode, MountNotice, MountPhase};
use crate::mount_driver::{MountCommand, MountController, Presentation};
use crate::scroll::ScrollContainer;

/// Descriptor of one pane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaneSpec {
    /// Stable pane key.
    pub key: PaneKey,
    /// Module holding the pane's heavy content.
    pub module: ModulePath,
}

impl PaneSpec {
    /// Create a descriptor.
    #[must_use]
    pub fn new(key: impl Into<PaneKey>, module: impl Into<ModulePath>) -> Self {
        Self {
            key: key.into(),
            module: module.into(),
        }
    }
}

/// Notices published by a session, in the order they happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionNotice {
    /// A pane's mount controller published a notice.
    Mount {
        /// Pane the unit belongs to.
        key: PaneKey,
        /// The notice.
        notice: MountNotice,
    },
    /// The focus controller published a notice.
    Focus(FocusNotice),
}

/// Orchestrator state for one page visit.
#[derive(Debug)]
pub struct Session<L: Loader> {
    config: OrchestratorConfig,
    registry: PaneRegistry,
    units: Vec<MountController>,
    cache: ModuleCache,
    loader: L,
    focus: FocusController,
    idle_requested: bool,
    notices: Vec<SessionNotice>,
    torn_down: bool,
}

impl<L: Loader> Session<L> {
    /// Build a session and run every unit's construction transition.
    ///
    /// `observation_supported` reports whether the host can measure
    /// visibility at all; without it every unit mounts immediately.
    pub fn new(
        panes: impl IntoIterator<Item = PaneSpec>,
        config: OrchestratorConfig,
        loader: L,
        observation_supported: bool,
        now: Duration,
    ) -> Result<Self, SessionError> {
        let panes: Vec<PaneSpec> = panes.into_iter().collect();
        let registry = PaneRegistry::new(panes.iter().map(|p| p.key.clone()))?;

        let units = panes
            .into_iter()
            .zip(registry.iter())
            .map(|(pane, entry)| {
                let mut mount = config.to_mount_config();
                if entry.is_first {
                    mount.mode = MountMode::Immediate;
                }
                MountController::new(pane.module, mount, observation_supported)
            })
            .collect();

        let mut session = Self {
            focus: FocusController::new(config.to_focus_config()),
            config,
            registry,
            units,
            cache: ModuleCache::new(),
            loader,
            idle_requested: false,
            notices: Vec::new(),
            torn_down: false,
        };
        tracing::debug!(
            target: "vista.session",
            panes = session.units.len(),
            observation_supported,
            "session started"
        );

        let mut work = VecDeque::new();
        for (i, unit) in session.units.iter_mut().enumerate() {
            work.extend(unit.start(now).into_iter().map(|c| (i, c)));
        }
        session.run(work, now);
        Ok(session)
    }

    // -- registration -------------------------------------------------------

    /// Register the live element of pane `key` and start observing it.
    pub fn attach(&mut self, key: &PaneKey, element: ElementId) -> Result<(), SessionError> {
        self.ensure_live()?;
        let index = self.index(key)?;
        self.registry.attach(key, element)?;
        self.units[index].attach(element);
        Ok(())
    }

    /// Forget the live element of pane `key`.
    pub fn detach(&mut self, key: &PaneKey) -> Result<(), SessionError> {
        self.ensure_live()?;
        let index = self.index(key)?;
        self.registry.detach(key)?;
        self.units[index].detach();
        Ok(())
    }

    // -- host signals -------------------------------------------------------

    /// The scroll root moved.
    pub fn on_scroll<C: ScrollContainer + ?Sized>(&mut self, container: &C, now: Duration) {
        if self.torn_down {
            return;
        }
        self.focus.on_scroll(container);
        self.measure(container, now);
        self.collect_notices();
    }

    /// Pane sizes or the viewport changed.
    pub fn on_layout<C: ScrollContainer + ?Sized>(&mut self, container: &mut C, now: Duration) {
        if self.torn_down {
            return;
        }
        self.focus.on_layout(&self.registry, container, now);
        self.measure(container, now);
        self.collect_notices();
    }

    /// Animation frame: advance fades, write tween steps, evaluate focus.
    pub fn on_frame<C: ScrollContainer + ?Sized>(&mut self, container: &mut C, now: Duration) {
        if self.torn_down {
            return;
        }
        self.advance_units(now);
        self.focus.on_frame(&self.registry, container, now);
        self.measure(container, now);
        self.collect_notices();
    }

    /// Direct user input.
    pub fn on_input<C: ScrollContainer + ?Sized>(
        &mut self,
        event: &InputEvent,
        container: &mut C,
        now: Duration,
    ) {
        if self.torn_down {
            return;
        }
        self.focus.on_input(event, &self.registry, container, now);
        self.collect_notices();
    }

    /// Fire due timers without a frame.
    pub fn advance<C: ScrollContainer + ?Sized>(&mut self, container: &mut C, now: Duration) {
        if self.torn_down {
            return;
        }
        self.advance_units(now);
        self.focus.advance(&self.registry, container, now);
        self.collect_notices();
    }

    /// Deliver the idle callback requested through [`idle_requested`](Self::idle_requested).
    pub fn idle(&mut self, now: Duration) {
        if self.torn_down {
            return;
        }
        self.idle_requested = false;
        let mut work = VecDeque::new();
        for (i, unit) in self.units.iter_mut().enumerate() {
            work.extend(unit.idle(now).into_iter().map(|c| (i, c)));
        }
        self.run(work, now);
        self.collect_notices();
    }

    /// Report the outcome of a fetch started through the loader.
    ///
    /// Stale tickets and completions after teardown are ignored. A failure
    /// is applied to every waiting unit and returned for the first of them.
    pub fn settle_fetch(
        &mut self,
        ticket: &FetchTicket,
        outcome: Result<(), FetchError>,
        now: Duration,
    ) -> Result<(), SessionError> {
        if self.torn_down {
            tracing::trace!(target: "vista.session", path = %ticket.path(), "fetch settled after teardown");
            return Ok(());
        }
        let Some(outcome) = self.cache.resolve(ticket, outcome) else {
            return Ok(());
        };
        let waiting: Vec<usize> = self.waiting_on(ticket.path());
        let result = self.settle_units(&waiting, outcome, now);
        self.collect_notices();
        result
    }

    // -- explicit requests --------------------------------------------------

    /// Focus pane `key`.
    pub fn request_focus<C: ScrollContainer + ?Sized>(
        &mut self,
        key: &PaneKey,
        container: &mut C,
        now: Duration,
    ) -> Result<(), SessionError> {
        self.ensure_live()?;
        let result = self.focus.request_focus(&self.registry, key, container, now);
        self.collect_notices();
        result.map_err(SessionError::from)
    }

    /// Clear focus, anchoring back to the last focused pane.
    pub fn request_unfocus<C: ScrollContainer + ?Sized>(
        &mut self,
        container: &mut C,
        now: Duration,
    ) -> Result<(), SessionError> {
        self.ensure_live()?;
        let result = self.focus.request_unfocus(&self.registry, container, now);
        self.collect_notices();
        result.map_err(SessionError::from)
    }

    /// Explicitly mount pane `key`'s unit, retrying a failed fetch.
    pub fn mount(&mut self, key: &PaneKey, now: Duration) -> Result<(), SessionError> {
        self.ensure_live()?;
        let index = self.index(key)?;
        let cmds = self.units[index].activate(now)?;
        self.run(cmds.into_iter().map(|c| (index, c)).collect(), now);
        self.collect_notices();
        Ok(())
    }

    /// Explicitly hide pane `key`'s unit.
    pub fn deactivate(&mut self, key: &PaneKey, now: Duration) -> Result<(), SessionError> {
        self.ensure_live()?;
        let index = self.index(key)?;
        let cmds = self.units[index].deactivate(now);
        self.run(cmds.into_iter().map(|c| (index, c)).collect(), now);
        self.collect_notices();
        Ok(())
    }

    /// Dispose every controller, cancel outstanding fetches, and restore
    /// the container's scroll configuration.
    pub fn teardown<C: ScrollContainer + ?Sized>(&mut self, container: &mut C) {
        if self.torn_down {
            return;
        }
        self.focus.teardown(container);
        for unit in &mut self.units {
            unit.teardown();
        }
        self.cache.close();
        self.idle_requested = false;
        self.torn_down = true;
        tracing::debug!(target: "vista.session", "session torn down");
    }

    // -- queries ------------------------------------------------------------

    /// Pane registry.
    #[must_use]
    pub fn registry(&self) -> &PaneRegistry {
        &self.registry
    }

    /// Configuration the session was built with.
    #[must_use]
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Focus snapshot for title displays and scroll-blocking guards.
    #[must_use]
    pub fn focus_snapshot(&self) -> FocusSnapshot {
        self.focus.snapshot()
    }

    /// Focus controller.
    #[must_use]
    pub fn focus(&self) -> &FocusController {
        &self.focus
    }

    /// Mount phase of pane `key`.
    #[must_use]
    pub fn mount_phase(&self, key: &PaneKey) -> Option<MountPhase> {
        self.unit(key).map(MountController::phase)
    }

    /// Presentation of pane `key`'s container.
    #[must_use]
    pub fn presentation(&self, key: &PaneKey) -> Option<Presentation> {
        self.unit(key).map(MountController::presentation)
    }

    /// Whether pane `key`'s heavy content exists.
    #[must_use]
    pub fn is_content_alive(&self, key: &PaneKey) -> bool {
        self.unit(key).is_some_and(MountController::is_alive)
    }

    /// Cache status of `path`.
    #[must_use]
    pub fn module_status(&self, path: &ModulePath) -> Option<ModuleStatus> {
        self.cache.status(path)
    }

    /// Whether some unit waits for an idle callback.
    #[must_use]
    pub fn idle_requested(&self) -> bool {
        self.idle_requested
    }

    /// Earliest timer deadline across all controllers.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        self.units
            .iter()
            .filter_map(MountController::next_deadline)
            .chain(self.focus.next_deadline())
            .min()
    }

    /// Whether [`teardown`](Self::teardown) ran.
    #[must_use]
    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// The loader.
    #[must_use]
    pub fn loader(&self) -> &L {
        &self.loader
    }

    /// The loader, mutably.
    pub fn loader_mut(&mut self) -> &mut L {
        &mut self.loader
    }

    /// Take pending notices.
    pub fn drain_notices(&mut self) -> Vec<SessionNotice> {
        std::mem::take(&mut self.notices)
    }

    // -- internals ----------------------------------------------------------

    fn ensure_live(&self) -> Result<(), SessionError> {
        if self.torn_down {
            Err(SessionError::TornDown)
        } else {
            Ok(())
        }
    }

    fn index(&self, key: &PaneKey) -> Result<usize, RegistryError> {
        self.registry
            .index_of(key)
            .ok_or_else(|| RegistryError::UnknownPane(key.clone()))
    }

    fn unit(&self, key: &PaneKey) -> Option<&MountController> {
        self.registry.index_of(key).and_then(|i| self.units.get(i))
    }

    fn waiting_on(&self, path: &ModulePath) -> Vec<usize> {
        self.units
            .iter()
            .enumerate()
            .filter(|(_, u)| u.module() == path && u.is_awaiting_fetch())
            .map(|(i, _)| i)
            .collect()
    }

    fn measure<C: ScrollContainer + ?Sized>(&mut self, container: &C, now: Duration) {
        let root = container.viewport();
        let mut work = VecDeque::new();
        for (i, pane) in self.registry.iter().enumerate() {
            let Some(rect) = pane.element.and_then(|e| container.element_rect(e)) else {
                continue;
            };
            let cmds = self.units[i].observe(&rect, &root, now);
            work.extend(cmds.into_iter().map(|c| (i, c)));
        }
        self.run(work, now);
    }

    fn advance_units(&mut self, now: Duration) {
        let mut work = VecDeque::new();
        for (i, unit) in self.units.iter_mut().enumerate() {
            work.extend(unit.advance(now).into_iter().map(|c| (i, c)));
        }
        self.run(work, now);
    }

    fn settle_units(
        &mut self,
        indices: &[usize],
        outcome: Result<(), FetchError>,
        now: Duration,
    ) -> Result<(), SessionError> {
        let mut first_error: Option<MountError> = None;
        let mut work = VecDeque::new();
        for &i in indices {
            match self.units[i].fetch_settled(outcome.clone(), now) {
                Ok(cmds) => work.extend(cmds.into_iter().map(|c| (i, c))),
                Err(e) => {
                    first_error.get_or_insert(e);
                    work.extend(self.units[i].advance(now).into_iter().map(|c| (i, c)));
                }
            }
        }
        self.run(work, now);
        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    /// Perform unit commands until none are left.
    fn run(&mut self, mut work: VecDeque<(usize, MountCommand)>, now: Duration) {
        while let Some((i, cmd)) = work.pop_front() {
            match cmd {
                MountCommand::RequestIdle => self.idle_requested = true,
                MountCommand::Fetch(path) => match self.cache.ensure(&path) {
                    Ensure::Begin(ticket) => self.loader.begin(ticket),
                    Ensure::Pending => {}
                    Ensure::Ready => {
                        if let Ok(cmds) = self.units[i].fetch_settled(Ok(()), now) {
                            work.extend(cmds.into_iter().map(|c| (i, c)));
                        }
                    }
                },
            }
        }
    }

    fn collect_notices(&mut self) {
        for (pane, unit) in self.registry.iter().zip(&mut self.units) {
            for notice in unit.drain_notices() {
                self.notices.push(SessionNotice::Mount {
                    key: pane.key.clone(),
                    notice,
                });
            }
        }
        self.notices
            .extend(self.focus.drain_notices().into_iter().map(SessionNotice::Focus));
    }
}
