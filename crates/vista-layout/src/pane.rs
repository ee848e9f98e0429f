#![forbid(unsafe_code)]

//! Ordered pane registry.
//!
//! The registry is built once per session from an ordered list of keys and
//! is frozen afterwards: no pane is ever inserted, removed or reordered.
//! Only the element handle of a pane changes, through explicit
//! [`attach`](PaneRegistry::attach) / [`detach`](PaneRegistry::detach)
//! calls made when the host creates or destroys the pane's surface.
//!
//! # Invariants
//!
//! 1. Keys are unique; insertion order is display order.
//! 2. Exactly the pane at index 0 has `is_first == true`.
//! 3. `index_of(key)` and `key_at(index)` are inverse of each other.
//!
//! # Failure Modes
//!
//! - Duplicate keys at construction return [`RegistryError::DuplicateKey`].
//! - Attaching to an unknown key returns [`RegistryError::UnknownPane`].

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

/// Stable identifier of a pane.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PaneKey(Arc<str>);

impl PaneKey {
    /// Create a key.
    #[must_use]
    pub fn new(key: impl AsRef<str>) -> Self {
        Self(Arc::from(key.as_ref()))
    }

    /// Borrow the key text.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PaneKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PaneKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for PaneKey {
    fn from(value: String) -> Self {
        Self(Arc::from(value))
    }
}

/// Opaque handle to a live host element (a DOM node, a widget id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub u64);

/// One scrollable content section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pane {
    /// Stable key.
    pub key: PaneKey,
    /// Live element handle, if the surface currently exists.
    pub element: Option<ElementId>,
    /// Whether this pane is first in display order (mounts eagerly).
    pub is_first: bool,
}

/// Errors from registry construction and element registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The same key appeared twice in the pane list.
    DuplicateKey(PaneKey),
    /// No pane has this key.
    UnknownPane(PaneKey),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateKey(key) => write!(f, "duplicate pane key: {key}"),
            Self::UnknownPane(key) => write!(f, "unknown pane: {key}"),
        }
    }
}

impl std::error::Error for RegistryError {}

/// Frozen, ordered list of panes.
#[derive(Debug, Clone, Default)]
pub struct PaneRegistry {
    panes: Vec<Pane>,
    index: FxHashMap<PaneKey, usize>,
}

impl PaneRegistry {
    /// Build a registry from keys in display order.
    pub fn new<I, K>(keys: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = K>,
        K: Into<PaneKey>,
    {
        let mut panes = Vec::new();
        let mut index = FxHashMap::default();
        for key in keys {
            let key = key.into();
            if index.insert(key.clone(), panes.len()).is_some() {
                return Err(RegistryError::DuplicateKey(key));
            }
            panes.push(Pane {
                key,
                element: None,
                is_first: panes.is_empty(),
            });
        }
        Ok(Self { panes, index })
    }

    /// Number of panes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.panes.len()
    }

    /// Whether the registry has no panes.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.panes.is_empty()
    }

    /// Look up a pane by key.
    #[must_use]
    pub fn get(&self, key: &PaneKey) -> Option<&Pane> {
        self.index_of(key).map(|i| &self.panes[i])
    }

    /// Display index of `key`.
    #[must_use]
    pub fn index_of(&self, key: &PaneKey) -> Option<usize> {
        self.index.get(key).copied()
    }

    /// Key at display index.
    #[must_use]
    pub fn key_at(&self, index: usize) -> Option<&PaneKey> {
        self.panes.get(index).map(|p| &p.key)
    }

    /// Whether a pane with `key` exists.
    #[must_use]
    pub fn contains(&self, key: &PaneKey) -> bool {
        self.index.contains_key(key)
    }

    /// The panes before and after `key` in display order.
    #[must_use]
    pub fn neighbors(&self, key: &PaneKey) -> (Option<&PaneKey>, Option<&PaneKey>) {
        let Some(i) = self.index_of(key) else {
            return (None, None);
        };
        let prev = i.checked_sub(1).and_then(|p| self.key_at(p));
        (prev, self.key_at(i + 1))
    }

    /// Attach a live element to a pane, returning the handle it replaced.
    pub fn attach(
        &mut self,
        key: &PaneKey,
        element: ElementId,
    ) -> Result<Option<ElementId>, RegistryError> {
        let pane = self.pane_mut(key)?;
        Ok(pane.element.replace(element))
    }

    /// Detach the element of a pane, returning it.
    pub fn detach(&mut self, key: &PaneKey) -> Result<Option<ElementId>, RegistryError> {
        let pane = self.pane_mut(key)?;
        Ok(pane.element.take())
    }

    /// Live element of a pane, if attached.
    #[must_use]
    pub fn element(&self, key: &PaneKey) -> Option<ElementId> {
        self.get(key).and_then(|p| p.element)
    }

    /// Iterate panes in display order.
    pub fn iter(&self) -> impl Iterator<Item = &Pane> {
        self.panes.iter()
    }

    /// Iterate keys in display order.
    pub fn keys(&self) -> impl Iterator<Item = &PaneKey> {
        self.panes.iter().map(|p| &p.key)
    }

    fn pane_mut(&mut self, key: &PaneKey) -> Result<&mut Pane, RegistryError> {
        match self.index.get(key) {
            Some(&i) => Ok(&mut self.panes[i]),
            None => Err(RegistryError::UnknownPane(key.clone())),
        }
    }
}
