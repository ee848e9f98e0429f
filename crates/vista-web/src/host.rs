#![forbid(unsafe_code)]

//! A complete simulated host: clock, page, loader and session in one place.
//!
//! Every method advances or reads the same [`DeterministicClock`], so test
//! scripts read as a timeline: scroll, wait some frames, settle a fetch.
//! Programmatic scroll writes are echoed back to the session as scroll
//! events, as a browser would.

use core::time::Duration;

use vista_core::clock::Clock;
use vista_core::event::InputEvent;
use vista_layout::PaneKey;
use vista_runtime::{
    FetchError, ModulePath, OrchestratorConfig, PaneSpec, ScrollContainer, Session, SessionError,
    SessionNotice,
};

use crate::DeterministicClock;
use crate::loader::ScriptedLoader;
use crate::page::SimulatedPage;

/// Frame interval used by [`SimulatedHost::run_for`].
pub const FRAME: Duration = Duration::from_millis(16);

/// Clock, page and session wired together.
#[derive(Debug)]
pub struct SimulatedHost {
    clock: DeterministicClock,
    page: SimulatedPage,
    session: Session<ScriptedLoader>,
    notices: Vec<SessionNotice>,
}

impl SimulatedHost {
    /// Build a session over `panes`, attach pane `i` to the page's element
    /// `i`, and run an initial layout pass.
    pub fn new(
        panes: impl IntoIterator<Item = PaneSpec>,
        page: SimulatedPage,
        config: OrchestratorConfig,
    ) -> Result<Self, SessionError> {
        Self::with_observation(panes, page, config, true)
    }

    /// Like [`new`](Self::new), choosing whether visibility can be observed.
    pub fn with_observation(
        panes: impl IntoIterator<Item = PaneSpec>,
        mut page: SimulatedPage,
        config: OrchestratorConfig,
        observation_supported: bool,
    ) -> Result<Self, SessionError> {
        let clock = DeterministicClock::new();
        let mut session = Session::new(
            panes,
            config,
            ScriptedLoader::new(),
            observation_supported,
            clock.now_mono(),
        )?;
        let keys: Vec<PaneKey> = session.registry().keys().cloned().collect();
        for (i, key) in keys.iter().enumerate() {
            session.attach(key, SimulatedPage::element(i))?;
        }
        session.on_layout(&mut page, clock.now_mono());
        let mut host = Self {
            clock,
            page,
            session,
            notices: Vec::new(),
        };
        host.collect();
        Ok(host)
    }

    /// Current simulated time.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.clock.now_mono()
    }

    /// Advance time by `dt` and deliver one frame.
    pub fn frame(&mut self, dt: Duration) {
        self.clock.advance(dt);
        let before = self.page.scroll_top();
        self.session.on_frame(&mut self.page, self.clock.now_mono());
        self.echo_scroll(before);
    }

    /// Deliver frames every [`FRAME`] for `total`.
    pub fn run_for(&mut self, total: Duration) {
        let end = self.now().saturating_add(total);
        while self.now() < end {
            let dt = FRAME.min(end.saturating_sub(self.now()));
            self.frame(dt);
        }
    }

    /// Advance time without a frame, firing due timers.
    pub fn wait(&mut self, dt: Duration) {
        self.clock.advance(dt);
        self.session.advance(&mut self.page, self.clock.now_mono());
        self.collect();
    }

    /// The user scrolls to `top`.
    pub fn user_scroll_to(&mut self, top: f64) {
        self.page.user_scroll_to(top);
        self.session.on_scroll(&self.page, self.clock.now_mono());
        self.collect();
    }

    /// Direct user input.
    pub fn input(&mut self, event: InputEvent) {
        let before = self.page.scroll_top();
        self.session
            .on_input(&event, &mut self.page, self.clock.now_mono());
        self.echo_scroll(before);
    }

    /// Resize pane `index` and run a layout pass.
    pub fn resize_pane(&mut self, index: usize, height: f64) {
        let before = self.page.scroll_top();
        self.page.set_pane_height(index, height);
        self.session.on_layout(&mut self.page, self.clock.now_mono());
        self.echo_scroll(before);
    }

    /// Request focus on `key`.
    pub fn focus(&mut self, key: &str) -> Result<(), SessionError> {
        let before = self.page.scroll_top();
        let result = self
            .session
            .request_focus(&PaneKey::new(key), &mut self.page, self.clock.now_mono());
        self.echo_scroll(before);
        result
    }

    /// Request unfocus.
    pub fn unfocus(&mut self) -> Result<(), SessionError> {
        let before = self.page.scroll_top();
        let result = self
            .session
            .request_unfocus(&mut self.page, self.clock.now_mono());
        self.echo_scroll(before);
        result
    }

    /// Explicitly mount `key`, retrying a failed fetch.
    pub fn mount(&mut self, key: &str) -> Result<(), SessionError> {
        let result = self.session.mount(&PaneKey::new(key), self.clock.now_mono());
        self.collect();
        result
    }

    /// Deliver the idle callback if one was requested.
    pub fn idle(&mut self) {
        if self.session.idle_requested() {
            self.session.idle(self.clock.now_mono());
            self.collect();
        }
    }

    /// Settle the pending fetch for `path`. Returns `Ok(false)` when none is pending.
    pub fn settle(
        &mut self,
        path: &str,
        outcome: Result<(), FetchError>,
    ) -> Result<bool, SessionError> {
        let Some(ticket) = self.session.loader_mut().take(&ModulePath::new(path)) else {
            return Ok(false);
        };
        let result = self
            .session
            .settle_fetch(&ticket, outcome, self.clock.now_mono());
        self.collect();
        result.map(|()| true)
    }

    /// Settle every pending fetch successfully.
    pub fn settle_all(&mut self) {
        let tickets = self.session.loader_mut().take_pending();
        for ticket in tickets {
            // Successful settlements never fail.
            let _ = self
                .session
                .settle_fetch(&ticket, Ok(()), self.clock.now_mono());
        }
        self.collect();
    }

    /// Tear the session down.
    pub fn teardown(&mut self) {
        self.session.teardown(&mut self.page);
        self.collect();
    }

    /// The simulated page.
    #[must_use]
    pub fn page(&self) -> &SimulatedPage {
        &self.page
    }

    /// The simulated page, mutably.
    pub fn page_mut(&mut self) -> &mut SimulatedPage {
        &mut self.page
    }

    /// The session.
    #[must_use]
    pub fn session(&self) -> &Session<ScriptedLoader> {
        &self.session
    }

    /// The session, mutably.
    pub fn session_mut(&mut self) -> &mut Session<ScriptedLoader> {
        &mut self.session
    }

    /// Every notice published so far.
    #[must_use]
    pub fn notices(&self) -> &[SessionNotice] {
        &self.notices
    }

    fn echo_scroll(&mut self, before: f64) {
        if self.page.scroll_top() != before {
            self.session.on_scroll(&self.page, self.clock.now_mono());
        }
        self.collect();
    }

    fn collect(&mut self) {
        self.notices.extend(self.session.drain_notices());
    }
}
