#![forbid(unsafe_code)]

//! A loader whose fetches complete only when the test says so.

use vista_runtime::{FetchTicket, Loader, ModulePath};

/// Records every fetch the session begins and holds it until settled.
#[derive(Debug, Clone, Default)]
pub struct ScriptedLoader {
    pending: Vec<FetchTicket>,
    begun: Vec<ModulePath>,
}

impl ScriptedLoader {
    /// Create a loader with nothing in flight.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total fetches begun, in order.
    #[must_use]
    pub fn begun(&self) -> &[ModulePath] {
        &self.begun
    }

    /// Number of fetches begun for `path`.
    #[must_use]
    pub fn begin_count(&self, path: &ModulePath) -> usize {
        self.begun.iter().filter(|p| *p == path).count()
    }

    /// Fetches not yet taken for settlement.
    #[must_use]
    pub fn pending(&self) -> &[FetchTicket] {
        &self.pending
    }

    /// Take every pending ticket.
    pub fn take_pending(&mut self) -> Vec<FetchTicket> {
        std::mem::take(&mut self.pending)
    }

    /// Take the pending ticket for `path`, if any.
    pub fn take(&mut self, path: &ModulePath) -> Option<FetchTicket> {
        let pos = self.pending.iter().position(|t| t.path() == path)?;
        Some(self.pending.remove(pos))
    }
}

impl Loader for ScriptedLoader {
    fn begin(&mut self, ticket: FetchTicket) {
        self.begun.push(ticket.path().clone());
        self.pending.push(ticket);
    }
}
