#![forbid(unsafe_code)]

//! Vista public facade crate.
//!
//! This crate provides the stable, ergonomic surface area for hosts. It
//! re-exports the orchestrator, its configuration and the input types a host
//! translates its native events into, plus a lightweight prelude.
//!
//! A host owns one [`Session`] per page visit and pushes signals into it:
//! scroll, layout, frames, input, idle callbacks and fetch completions. The
//! session answers with scroll writes and snap changes on the host's
//! [`ScrollContainer`], fetches through its [`Loader`], and notices the host
//! drains to update presentation.

pub mod error;

pub use error::{Error, Recovery, Result};

// --- Core re-exports -------------------------------------------------------

pub use vista_core::animation::{AnimationItem, Easing, Fade, Immediate};
pub use vista_core::clock::{Clock, SystemClock};
pub use vista_core::event::{
    InputEvent, KeyCode, KeyEvent, KeyEventKind, Modifiers, PointerEvent, PointerEventKind,
    TouchPhase,
};
pub use vista_core::geometry::Rect;

// --- Layout re-exports -----------------------------------------------------

pub use vista_layout::{ElementId, PaneKey, PaneRegistry, RegistryError, Thresholds};

// --- Runtime re-exports ----------------------------------------------------

pub use vista_runtime::{
    ConfigError, FetchError, FetchTicket, FocusController, FocusError, FocusNotice, FocusPhase,
    FocusSnapshot, Loader, ModulePath, ModuleStatus, MountController, MountError, MountMode,
    MountNotice, MountPhase, OrchestratorConfig, PaneSpec, Presentation, ScrollBehavior,
    ScrollContainer, Session, SessionError, SessionNotice, SnapMode,
};

// --- Web re-exports --------------------------------------------------------

#[cfg(feature = "web")]
pub use vista_web::{DeterministicClock, ScriptedLoader, SimulatedHost, SimulatedPage};

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        Error, InputEvent, Loader, ModulePath, OrchestratorConfig, PaneKey, PaneSpec, Recovery,
        Result, ScrollContainer, Session, SessionNotice, SnapMode,
    };

    #[cfg(feature = "web")]
    pub use crate::{SimulatedHost, SimulatedPage};

    pub use crate::{core, layout, runtime};
}

pub use vista_core as core;
pub use vista_layout as layout;
pub use vista_runtime as runtime;
#[cfg(feature = "web")]
pub use vista_web as web;
