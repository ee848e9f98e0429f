#![forbid(unsafe_code)]

//! Session-scoped module cache with fetch de-duplication.
//!
//! Every content unit names the code-split module it needs by
//! [`ModulePath`]. The cache guarantees that no matter how many units (or
//! how many preload triggers) ask for the same path, the [`Loader`] sees a
//! single fetch until that fetch settles.
//!
//! # Invariants
//!
//! 1. At most one fetch per path is in flight.
//! 2. A settled fetch is only applied if its ticket is the current one for
//!    its path; late or duplicate settlements are ignored.
//! 3. A failed entry is retried only by an explicit `ensure`.
//! 4. After `close()`, every outstanding ticket's token reports cancelled.

use std::fmt;
use std::sync::Arc;

use ahash::AHashMap;

use crate::cancellation::{CancellationSource, CancellationToken};
use crate::error::FetchError;

/// Identifier of a code-split module.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModulePath(Arc<str>);

impl ModulePath {
    /// Create a path.
    #[must_use]
    pub fn new(path: impl AsRef<str>) -> Self {
        Self(Arc::from(path.as_ref()))
    }

    /// Borrow the path text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModulePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModulePath {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Handle for one in-flight fetch.
#[derive(Debug, Clone)]
pub struct FetchTicket {
    path: ModulePath,
    id: u64,
    token: CancellationToken,
}

impl FetchTicket {
    /// Module being fetched.
    #[must_use]
    pub fn path(&self) -> &ModulePath {
        &self.path
    }

    /// Unique id of this fetch within the session.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Whether the owning session no longer wants the result.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Starts module fetches on behalf of a session.
///
/// Completion is reported back through the session with the same ticket.
pub trait Loader {
    /// Begin fetching `ticket.path()`.
    fn begin(&mut self, ticket: FetchTicket);
}

/// State of one cached path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleStatus {
    /// A fetch is in flight.
    Loading,
    /// The module is available.
    Ready,
    /// The last fetch failed.
    Failed(FetchError),
}

/// Outcome of [`ModuleCache::ensure`].
#[derive(Debug, Clone)]
pub enum Ensure {
    /// Already loaded.
    Ready,
    /// A fetch is already in flight; wait for it.
    Pending,
    /// Start this fetch.
    Begin(FetchTicket),
}

#[derive(Debug, Clone)]
enum Entry {
    InFlight(u64),
    Ready,
    Failed(FetchError),
}

/// Per-session module cache.
#[derive(Debug, Default)]
pub struct ModuleCache {
    entries: AHashMap<ModulePath, Entry>,
    next_id: u64,
    source: CancellationSource,
    closed: bool,
}

impl ModuleCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure `path` is loaded or loading.
    pub fn ensure(&mut self, path: &ModulePath) -> Ensure {
        match self.entries.get(path) {
            Some(Entry::Ready) => return Ensure::Ready,
            Some(Entry::InFlight(_)) => return Ensure::Pending,
            Some(Entry::Failed(_)) | None => {}
        }
        if self.closed {
            return Ensure::Pending;
        }
        self.next_id += 1;
        let id = self.next_id;
        self.entries.insert(path.clone(), Entry::InFlight(id));
        tracing::debug!(target: "vista.session", path = %path, id, "fetch begins");
        Ensure::Begin(FetchTicket {
            path: path.clone(),
            id,
            token: self.source.token(),
        })
    }

    /// Apply the outcome of a fetch.
    ///
    /// Returns `None` when the ticket is stale, otherwise the outcome to fan
    /// out to waiting units.
    pub fn resolve(
        &mut self,
        ticket: &FetchTicket,
        outcome: Result<(), FetchError>,
    ) -> Option<Result<(), FetchError>> {
        let current = matches!(
            self.entries.get(&ticket.path),
            Some(Entry::InFlight(id)) if *id == ticket.id
        );
        if !current || self.closed {
            tracing::trace!(target: "vista.session", path = %ticket.path, id = ticket.id, "stale fetch ignored");
            return None;
        }
        let entry = match &outcome {
            Ok(()) => Entry::Ready,
            Err(e) => {
                tracing::warn!(target: "vista.session", path = %ticket.path, error = %e, "fetch failed");
                Entry::Failed(e.clone())
            }
        };
        self.entries.insert(ticket.path.clone(), entry);
        Some(outcome)
    }

    /// Status of `path`, if it was ever requested.
    #[must_use]
    pub fn status(&self, path: &ModulePath) -> Option<ModuleStatus> {
        self.entries.get(path).map(|e| match e {
            Entry::InFlight(_) => ModuleStatus::Loading,
            Entry::Ready => ModuleStatus::Ready,
            Entry::Failed(err) => ModuleStatus::Failed(err.clone()),
        })
    }

    /// Number of paths with an entry.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was requested yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cancel outstanding tickets and drop all entries.
    pub fn close(&mut self) {
        self.source.cancel();
        self.entries.clear();
        self.closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn begin(cache: &mut ModuleCache, path: &ModulePath) -> FetchTicket {
        match cache.ensure(path) {
            Ensure::Begin(t) => t,
            other => panic!("expected Begin, got {other:?}"),
        }
    }

    #[test]
    fn concurrent_ensures_share_one_fetch() {
        let mut cache = ModuleCache::new();
        let path = ModulePath::new("units/game");
        let ticket = begin(&mut cache, &path);
        for _ in 0..5 {
            assert!(matches!(cache.ensure(&path), Ensure::Pending));
        }
        assert_eq!(cache.resolve(&ticket, Ok(())), Some(Ok(())));
        assert!(matches!(cache.ensure(&path), Ensure::Ready));
    }

    #[test]
    fn duplicate_settlement_is_ignored() {
        let mut cache = ModuleCache::new();
        let path = ModulePath::new("units/scoop");
        let ticket = begin(&mut cache, &path);
        assert!(cache.resolve(&ticket, Ok(())).is_some());
        assert!(cache.resolve(&ticket, Err(FetchError::Cancelled)).is_none());
        assert_eq!(cache.status(&path), Some(ModuleStatus::Ready));
    }

    #[test]
    fn failure_waits_for_explicit_retry() {
        let mut cache = ModuleCache::new();
        let path = ModulePath::new("units/rotary");
        let first = begin(&mut cache, &path);
        let err = FetchError::Failed("offline".into());
        assert_eq!(cache.resolve(&first, Err(err.clone())), Some(Err(err.clone())));
        assert_eq!(cache.status(&path), Some(ModuleStatus::Failed(err)));

        let second = begin(&mut cache, &path);
        assert_ne!(first.id(), second.id());
        assert!(cache.resolve(&first, Ok(())).is_none(), "old ticket is stale");
        assert!(cache.resolve(&second, Ok(())).is_some());
    }

    #[test]
    fn close_cancels_tickets() {
        let mut cache = ModuleCache::new();
        let path = ModulePath::new("units/dataviz");
        let ticket = begin(&mut cache, &path);
        cache.close();
        assert!(ticket.is_cancelled());
        assert!(cache.resolve(&ticket, Ok(())).is_none());
        assert!(matches!(cache.ensure(&path), Ensure::Pending));
        assert!(cache.is_empty());
    }
}
