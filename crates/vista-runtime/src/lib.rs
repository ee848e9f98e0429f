#![forbid(unsafe_code)]

//! Vista Runtime
//!
//! This crate provides the orchestrator: the progressive mount and focus
//! choreography state machines, their drivers, and the session context that
//! ties them to a host's scroll root, loader and clock.
//!
//! # Key Components
//!
//! - [`Session`] - Session context owning registry, module cache and controllers
//! - [`MountController`] - Driver for one lazily mounted content unit
//! - [`FocusController`] - Driver for the single focused pane
//! - [`ScrollContainer`] - Trait the host's scroll root implements
//! - [`ModuleCache`] - Session-scoped fetch de-duplication
//! - [`OrchestratorConfig`] - Every tunable, loadable from TOML or JSON
//!
//! # Role in Vista
//! `vista-runtime` is the orchestrator. It consumes input events and
//! animation items from `vista-core`, panes and visibility sensors from
//! `vista-layout`, and turns host signals into scroll writes, snap-mode
//! changes, fetches and presentation updates.
//!
//! # How it fits in the system
//! Hosts push time, frames, scroll, input and fetch completions into a
//! [`Session`]; nothing here blocks, spawns, or reads a clock. `vista-web`
//! provides a simulated host used by the end-to-end tests.

pub mod cancellation;
pub mod config;
pub mod error;
pub mod focus;
pub mod focus_driver;
pub mod module_cache;
pub mod mount;
pub mod mount_driver;
pub mod scroll;
pub mod session;
pub mod timer;

pub use cancellation::{CancellationSource, CancellationToken, Generation};
pub use config::{
    ConfigError, FocusPolicy, MountPolicy, OrchestratorConfig, TweenPolicy, VisibilityPolicy,
};
pub use error::{FetchError, FocusError, MountError, SessionError};
pub use focus::{FocusConfig, FocusNotice, FocusPhase, FocusState};
pub use focus_driver::{FocusController, FocusSnapshot};
pub use module_cache::{FetchTicket, Loader, ModuleCache, ModulePath, ModuleStatus};
pub use mount::{MountConfig, MountMode, MountNotice, MountPhase, MountState};
pub use mount_driver::{MountCommand, MountController, Presentation};
pub use scroll::{ScrollBehavior, ScrollContainer, ScrollTween, SnapMode, TweenStatus, tween_to};
pub use session::{PaneSpec, Session, SessionNotice};
pub use timer::TimerQueue;
