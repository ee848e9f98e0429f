#![forbid(unsafe_code)]

//! Error types for the orchestration runtime.
//!
//! Drive paths never panic. Failures that the host must react to are
//! returned as these enums or published as notices carrying them.

use std::fmt;

use vista_layout::{PaneKey, RegistryError};

use crate::module_cache::ModulePath;

/// Why a module fetch did not produce a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The loader reported a failure.
    Failed(String),
    /// The fetch was abandoned because its session went away.
    Cancelled,
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed(reason) => write!(f, "fetch failed: {reason}"),
            Self::Cancelled => f.write_str("fetch cancelled"),
        }
    }
}

impl std::error::Error for FetchError {}

/// Errors from a mount controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MountError {
    /// The unit's module could not be fetched. No retry is scheduled.
    FetchFailed {
        /// Module that failed.
        path: ModulePath,
        /// Loader failure.
        source: FetchError,
    },
    /// The controller was torn down.
    Disposed,
}

impl fmt::Display for MountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FetchFailed { path, source } => write!(f, "could not load {path}: {source}"),
            Self::Disposed => f.write_str("mount controller was torn down"),
        }
    }
}

impl std::error::Error for MountError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::FetchFailed { source, .. } => Some(source),
            Self::Disposed => None,
        }
    }
}

/// Errors from the focus controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FocusError {
    /// Focus was requested for a key the registry does not know.
    UnknownPane(PaneKey),
    /// The controller was torn down.
    Disposed,
}

impl fmt::Display for FocusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownPane(key) => write!(f, "cannot focus unknown pane {key}"),
            Self::Disposed => f.write_str("focus controller was torn down"),
        }
    }
}

impl std::error::Error for FocusError {}

/// Errors from [`Session`](crate::session::Session) operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Pane registry construction or registration failed.
    Registry(RegistryError),
    /// A mount controller rejected the call.
    Mount(MountError),
    /// The focus controller rejected the call.
    Focus(FocusError),
    /// The session was torn down.
    TornDown,
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Registry(e) => write!(f, "registry: {e}"),
            Self::Mount(e) => write!(f, "mount: {e}"),
            Self::Focus(e) => write!(f, "focus: {e}"),
            Self::TornDown => f.write_str("session was torn down"),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Registry(e) => Some(e),
            Self::Mount(e) => Some(e),
            Self::Focus(e) => Some(e),
            Self::TornDown => None,
        }
    }
}

impl From<RegistryError> for SessionError {
    fn from(e: RegistryError) -> Self {
        Self::Registry(e)
    }
}

impl From<MountError> for SessionError {
    fn from(e: MountError) -> Self {
        Self::Mount(e)
    }
}

impl From<FocusError> for SessionError {
    fn from(e: FocusError) -> Self {
        Self::Focus(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn fetch_failed_chains_source() {
        let err = MountError::FetchFailed {
            path: ModulePath::new("units/game"),
            source: FetchError::Failed("404".into()),
        };
        assert_eq!(err.to_string(), "could not load units/game: fetch failed: 404");
        assert!(err.source().is_some());
    }

    #[test]
    fn session_error_wraps_focus() {
        let err: SessionError = FocusError::UnknownPane(PaneKey::new("x")).into();
        assert_eq!(err.to_string(), "focus: cannot focus unknown pane x");
    }
}
