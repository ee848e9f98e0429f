#![forbid(unsafe_code)]

//! Pane layout primitives: the frozen pane registry, visibility sensing with
//! hysteresis, and exit-candidate selection.
//!
//! Nothing here owns time. Hosts (or the runtime drivers) measure rectangles
//! and feed them in; the types in this crate only remember the last-seen
//! state needed for edge detection.

pub mod candidate;
pub mod pane;
pub mod visibility;

pub use candidate::{CandidateSample, pick_exit_candidate};
pub use pane::{ElementId, Pane, PaneKey, PaneRegistry, RegistryError};
pub use visibility::{SensorUnavailable, Thresholds, VisibilityReport, VisibilitySensor};
pub use vista_core::geometry::Rect;
