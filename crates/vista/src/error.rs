#![forbid(unsafe_code)]

//! Vista error model and recovery hints.
//!
//! # Design Principles
//!
//! 1. **Result everywhere**: no panics on the drive path.
//! 2. **Domain-specific errors**: each subsystem keeps its own typed error;
//!    [`Error`] only unifies them for applications that want one `?` type.
//! 3. **Recovery, not retry loops**: every variant maps to a [`Recovery`]
//!    the host can act on. Nothing here retries by itself.

use std::fmt;

use vista_layout::RegistryError;
use vista_runtime::{ConfigError, FetchError, FocusError, MountError, SessionError};

// ── Unified Error ───────────────────────────────────────────────────────

/// Top-level error type for Vista hosts.
///
/// Use [`Error::recovery`] to decide what to do next.
#[derive(Debug)]
pub enum Error {
    /// A session call failed.
    Session(SessionError),
    /// A mount controller rejected a call.
    Mount(MountError),
    /// The focus controller rejected a call.
    Focus(FocusError),
    /// A loader reported a failure.
    Fetch(FetchError),
    /// The pane list or a registration was invalid.
    Registry(RegistryError),
    /// The configuration could not be loaded.
    Config(ConfigError),
}

/// Standard result type for Vista APIs.
pub type Result<T> = std::result::Result<T, Error>;

// ── Recovery ────────────────────────────────────────────────────────────

/// What the host should do after an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Call `Session::mount` for the pane when the loader is healthy again.
    RetryMount,
    /// Drop the request; orchestrator state is unchanged.
    IgnoreRequest,
    /// The pane list is invalid; fix it and build a new session.
    RebuildSession,
    /// Keep running with `OrchestratorConfig::default()`.
    UseDefaults,
    /// The session is gone; stop driving it.
    Stop,
}

impl Error {
    /// Recovery hint for this error.
    #[must_use]
    pub fn recovery(&self) -> Recovery {
        match self {
            Self::Session(SessionError::Registry(e)) | Self::Registry(e) => registry_recovery(e),
            Self::Session(SessionError::Mount(e)) | Self::Mount(e) => mount_recovery(e),
            Self::Session(SessionError::Focus(e)) | Self::Focus(e) => focus_recovery(e),
            Self::Session(SessionError::TornDown) => Recovery::Stop,
            Self::Fetch(FetchError::Failed(_)) => Recovery::RetryMount,
            Self::Fetch(FetchError::Cancelled) => Recovery::Stop,
            Self::Config(_) => Recovery::UseDefaults,
        }
    }

    /// Error type label for tracing fields.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Session(_) => "session",
            Self::Mount(_) => "mount",
            Self::Focus(_) => "focus",
            Self::Fetch(_) => "fetch",
            Self::Registry(_) => "registry",
            Self::Config(_) => "config",
        }
    }

    /// Whether the host can keep driving the session.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        !matches!(self.recovery(), Recovery::Stop | Recovery::RebuildSession)
    }
}

fn registry_recovery(err: &RegistryError) -> Recovery {
    match err {
        RegistryError::DuplicateKey(_) => Recovery::RebuildSession,
        RegistryError::UnknownPane(_) => Recovery::IgnoreRequest,
    }
}

fn mount_recovery(err: &MountError) -> Recovery {
    match err {
        MountError::FetchFailed { .. } => Recovery::RetryMount,
        MountError::Disposed => Recovery::Stop,
    }
}

fn focus_recovery(err: &FocusError) -> Recovery {
    match err {
        FocusError::UnknownPane(_) => Recovery::IgnoreRequest,
        FocusError::Disposed => Recovery::Stop,
    }
}

// ── Display / std::error::Error ─────────────────────────────────────────

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Session(err) => write!(f, "{err}"),
            Self::Mount(err) => write!(f, "{err}"),
            Self::Focus(err) => write!(f, "{err}"),
            Self::Fetch(err) => write!(f, "{err}"),
            Self::Registry(err) => write!(f, "{err}"),
            Self::Config(err) => write!(f, "config: {err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Session(err) => Some(err),
            Self::Mount(err) => Some(err),
            Self::Focus(err) => Some(err),
            Self::Fetch(err) => Some(err),
            Self::Registry(err) => Some(err),
            Self::Config(err) => Some(err),
        }
    }
}

// ── From conversions ────────────────────────────────────────────────────

impl From<SessionError> for Error {
    fn from(err: SessionError) -> Self {
        Self::Session(err)
    }
}

impl From<MountError> for Error {
    fn from(err: MountError) -> Self {
        Self::Mount(err)
    }
}

impl From<FocusError> for Error {
    fn from(err: FocusError) -> Self {
        Self::Focus(err)
    }
}

impl From<FetchError> for Error {
    fn from(err: FetchError) -> Self {
        Self::Fetch(err)
    }
}

impl From<RegistryError> for Error {
    fn from(err: RegistryError) -> Self {
        Self::Registry(err)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

// ── Tests ───────────────────────────────────────────────────────────────
