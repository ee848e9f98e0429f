#![forbid(unsafe_code)]

//! Orchestrator configuration as data.
//!
//! [`OrchestratorConfig`] groups every tunable of the mount and focus
//! machines, the scroll tweens, and the visibility sensor. With the
//! `policy-config` feature it loads from TOML or JSON; partial files
//! override only the fields they name.
//!
//! # Loading
//!
//! ```toml
//! reduced_motion = false
//!
//! [mount]
//! mode = "visibility_driven"
//! unmount_delay_ms = 150
//!
//! [focus]
//! dwell_ms = 120
//! visibility_floor = 0.2
//!
//! [visibility]
//! enter = 0.0
//! exit = 0.0
//! ```
//!
//! ```rust,ignore
//! let config = OrchestratorConfig::from_toml_file("vista.toml")?;
//! let problems = config.validate();
//! ```
//!
//! # Defaults
//!
//! `OrchestratorConfig::default()` converts to exactly
//! `MountConfig::default()` and `FocusConfig::default()`.

#[cfg(feature = "policy-config")]
use std::path::Path;
use std::time::Duration;

#[cfg(feature = "policy-config")]
use serde::{Deserialize, Serialize};

use vista_layout::Thresholds;

use crate::focus::FocusConfig;
use crate::mount::{MountConfig, MountMode};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Every tunable of a session.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "policy-config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "policy-config", serde(default))]
pub struct OrchestratorConfig {
    /// Mount machine parameters.
    pub mount: MountPolicy,
    /// Focus machine parameters.
    pub focus: FocusPolicy,
    /// Scroll tween parameters.
    pub tween: TweenPolicy,
    /// Visibility sensor thresholds.
    pub visibility: VisibilityPolicy,
    /// Skip fades and tweens. Default: false.
    pub reduced_motion: bool,
}

impl OrchestratorConfig {
    /// Load from a TOML string.
    #[cfg(feature = "policy-config")]
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(ConfigError::Toml)
    }

    /// Load from a TOML file on disk.
    #[cfg(feature = "policy-config")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string.
    #[cfg(feature = "policy-config")]
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(s).map_err(ConfigError::Json)
    }

    /// Load from a JSON file on disk.
    #[cfg(feature = "policy-config")]
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_json_str(&content)
    }

    /// Validate all parameters are within acceptable ranges.
    ///
    /// Returns a list of problems. An empty list means the config is valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.mount.unmount_delay_ms == 0 {
            errors.push("mount.unmount_delay_ms must be > 0".into());
        }
        if self.mount.idle_timeout_ms == 0 {
            errors.push("mount.idle_timeout_ms must be > 0".into());
        }

        if !(0.0..=1.0).contains(&self.focus.visibility_floor) {
            errors.push(format!(
                "focus.visibility_floor must be in [0, 1], got {}",
                self.focus.visibility_floor
            ));
        }
        if self.focus.exit_fallback_ms < self.focus.linger_ms {
            errors.push(format!(
                "focus.exit_fallback_ms ({}) must be >= focus.linger_ms ({})",
                self.focus.exit_fallback_ms, self.focus.linger_ms
            ));
        }
        if self.focus.exit_fallback_ms < self.tween.exit_ms {
            errors.push(format!(
                "focus.exit_fallback_ms ({}) must be >= tween.exit_ms ({})",
                self.focus.exit_fallback_ms, self.tween.exit_ms
            ));
        }
        if self.focus.resize_guard_px < 0.0 {
            errors.push(format!(
                "focus.resize_guard_px must be >= 0, got {}",
                self.focus.resize_guard_px
            ));
        }
        if self.focus.direction_dead_band < 0.0 {
            errors.push(format!(
                "focus.direction_dead_band must be >= 0, got {}",
                self.focus.direction_dead_band
            ));
        }
        if self.focus.drag_threshold <= 0.0 {
            errors.push(format!(
                "focus.drag_threshold must be > 0, got {}",
                self.focus.drag_threshold
            ));
        }

        if !(0.0..=1.0).contains(&self.tween.settle_fraction) {
            errors.push(format!(
                "tween.settle_fraction must be in [0, 1], got {}",
                self.tween.settle_fraction
            ));
        }

        // exit > enter is clamped, not rejected; only the range is checked.
        for (name, v) in [("enter", self.visibility.enter), ("exit", self.visibility.exit)] {
            if !(0.0..=1.0).contains(&v) {
                errors.push(format!("visibility.{name} must be in [0, 1], got {v}"));
            }
        }
        if self.visibility.steps.iter().any(|s| !(0.0..=1.0).contains(s)) {
            errors.push("visibility.steps must all be in [0, 1]".into());
        }

        errors
    }

    /// Sensor thresholds.
    #[must_use]
    pub fn thresholds(&self) -> Thresholds {
        Thresholds::new(self.visibility.enter, self.visibility.exit)
            .with_steps(self.visibility.steps.iter().copied())
    }

    /// Build a [`MountConfig`] for an ordinary (non-first) pane.
    #[must_use]
    pub fn to_mount_config(&self) -> MountConfig {
        MountConfig {
            mode: self.mount.mode,
            preload_on_idle: self.mount.preload_on_idle,
            preload_on_first_visibility: self.mount.preload_on_first_visibility,
            fade_in: ms(self.mount.fade_in_ms),
            fade_out: ms(self.mount.fade_out_ms),
            unmount_delay: ms(self.mount.unmount_delay_ms),
            idle_timeout: ms(self.mount.idle_timeout_ms),
            thresholds: self.thresholds(),
            reduced_motion: self.reduced_motion,
        }
    }

    /// Build a [`FocusConfig`].
    #[must_use]
    pub fn to_focus_config(&self) -> FocusConfig {
        FocusConfig {
            settle_fraction: self.tween.settle_fraction,
            settle_duration: ms(self.tween.settle_ms),
            visibility_floor: self.focus.visibility_floor,
            dwell: ms(self.focus.dwell_ms),
            linger: ms(self.focus.linger_ms),
            ramp: ms(self.focus.ramp_ms),
            exit_tween: ms(self.tween.exit_ms),
            exit_fallback: ms(self.focus.exit_fallback_ms),
            resize_guard_px: self.focus.resize_guard_px,
            direction_dead_band: self.focus.direction_dead_band,
            drag_threshold: self.focus.drag_threshold,
            reduced_motion: self.reduced_motion,
        }
    }
}

const fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

// ---------------------------------------------------------------------------
// Sections (flat, serde-friendly)
// ---------------------------------------------------------------------------

/// Mount machine parameters.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "policy-config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "policy-config", serde(default))]
pub struct MountPolicy {
    /// Mount mode for every pane but the first. Default: visibility_driven.
    pub mode: MountMode,
    /// Fetch on the first idle signal. Default: false.
    pub preload_on_idle: bool,
    /// Fetch on the first intersection. Default: true.
    pub preload_on_first_visibility: bool,
    /// Default: 300.
    pub fade_in_ms: u64,
    /// Default: 200.
    pub fade_out_ms: u64,
    /// Exit debounce. Default: 150.
    pub unmount_delay_ms: u64,
    /// Idle-signal fallback. Default: 2000.
    pub idle_timeout_ms: u64,
}

impl Default for MountPolicy {
    fn default() -> Self {
        Self {
            mode: MountMode::VisibilityDriven,
            preload_on_idle: false,
            preload_on_first_visibility: true,
            fade_in_ms: 300,
            fade_out_ms: 200,
            unmount_delay_ms: 150,
            idle_timeout_ms: 2000,
        }
    }
}

/// Focus machine parameters.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "policy-config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "policy-config", serde(default))]
pub struct FocusPolicy {
    /// Minimum ratio for an exit candidate. Default: 0.2.
    pub visibility_floor: f64,
    /// Candidate persistence before auto-unfocus. Default: 120.
    pub dwell_ms: u64,
    /// Minimum exit-anchoring time. Default: 200.
    pub linger_ms: u64,
    /// Proximity snap before mandatory. Default: 300.
    pub ramp_ms: u64,
    /// Exit-anchoring deadline. Default: 1500.
    pub exit_fallback_ms: u64,
    /// Height loss that triggers an anchor correction. Default: 48.
    pub resize_guard_px: f64,
    /// Default: 2.
    pub direction_dead_band: f64,
    /// Default: 6.
    pub drag_threshold: f64,
}

impl Default for FocusPolicy {
    fn default() -> Self {
        Self {
            visibility_floor: 0.20,
            dwell_ms: 120,
            linger_ms: 200,
            ramp_ms: 300,
            exit_fallback_ms: 1500,
            resize_guard_px: 48.0,
            direction_dead_band: 2.0,
            drag_threshold: 6.0,
        }
    }
}

/// Scroll tween parameters.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "policy-config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "policy-config", serde(default))]
pub struct TweenPolicy {
    /// Entry settle bump as a fraction of viewport height. Default: 0.1.
    pub settle_fraction: f64,
    /// Default: 240.
    pub settle_ms: u64,
    /// Default: 500.
    pub exit_ms: u64,
}

impl Default for TweenPolicy {
    fn default() -> Self {
        Self {
            settle_fraction: 0.10,
            settle_ms: 240,
            exit_ms: 500,
        }
    }
}

/// Visibility sensor thresholds.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "policy-config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "policy-config", serde(default))]
pub struct VisibilityPolicy {
    /// Default: 0.
    pub enter: f64,
    /// Clamped to `enter` when larger. Default: 0.
    pub exit: f64,
    /// Extra ratio buckets that trigger reports.
    pub steps: Vec<f64>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur when loading a configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// I/O error reading a file.
    Io(std::io::Error),
    /// TOML parse error.
    #[cfg(feature = "policy-config")]
    Toml(toml::de::Error),
    /// JSON parse error.
    #[cfg(feature = "policy-config")]
    Json(serde_json::Error),
    /// Validation errors.
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            #[cfg(feature = "policy-config")]
            Self::Toml(e) => write!(f, "TOML parse error: {e}"),
            #[cfg(feature = "policy-config")]
            Self::Json(e) => write!(f, "JSON parse error: {e}"),
            Self::Validation(errors) => {
                write!(f, "validation errors: {}", errors.join("; "))
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            #[cfg(feature = "policy-config")]
            Self::Toml(e) => Some(e),
            #[cfg(feature = "policy-config")]
            Self::Json(e) => Some(e),
            Self::Validation(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_matches_component_defaults() {
        let config = OrchestratorConfig::default();

        let mount = config.to_mount_config();
        let expected = MountConfig::default();
        assert_eq!(mount.mode, expected.mode);
        assert_eq!(mount.preload_on_idle, expected.preload_on_idle);
        assert_eq!(
            mount.preload_on_first_visibility,
            expected.preload_on_first_visibility
        );
        assert_eq!(mount.fade_in, expected.fade_in);
        assert_eq!(mount.fade_out, expected.fade_out);
        assert_eq!(mount.unmount_delay, expected.unmount_delay);
        assert_eq!(mount.idle_timeout, expected.idle_timeout);
        assert_eq!(mount.thresholds, expected.thresholds);

        let focus = config.to_focus_config();
        let expected = FocusConfig::default();
        assert_eq!(focus.settle_fraction, expected.settle_fraction);
        assert_eq!(focus.settle_duration, expected.settle_duration);
        assert_eq!(focus.visibility_floor, expected.visibility_floor);
        assert_eq!(focus.dwell, expected.dwell);
        assert_eq!(focus.linger, expected.linger);
        assert_eq!(focus.ramp, expected.ramp);
        assert_eq!(focus.exit_tween, expected.exit_tween);
        assert_eq!(focus.exit_fallback, expected.exit_fallback);
        assert_eq!(focus.resize_guard_px, expected.resize_guard_px);
    }

    #[test]
    fn default_validates_clean() {
        let errors = OrchestratorConfig::default().validate();
        assert!(errors.is_empty(), "{errors:?}");
    }

    #[test]
    fn multiple_validation_errors_collected() {
        let mut config = OrchestratorConfig::default();
        config.focus.visibility_floor = 1.5;
        config.mount.unmount_delay_ms = 0;
        config.tween.settle_fraction = -0.1;
        let errors = config.validate();
        assert!(errors.len() >= 3, "should catch multiple errors: {errors:?}");
    }

    #[test]
    fn fallback_shorter_than_exit_tween_is_rejected() {
        let mut config = OrchestratorConfig::default();
        config.tween.exit_ms = 900;
        config.focus.exit_fallback_ms = 600;
        assert_eq!(
            config.validate(),
            vec!["focus.exit_fallback_ms (600) must be >= tween.exit_ms (900)".to_string()]
        );

        config.focus.exit_fallback_ms = 900;
        assert!(config.validate().is_empty());
    }

    #[test]
    fn exit_above_enter_is_not_a_validation_error() {
        let mut config = OrchestratorConfig::default();
        config.visibility.enter = 0.3;
        config.visibility.exit = 0.6;
        assert!(config.validate().is_empty());
        let t = config.thresholds();
        assert_eq!(t.exit(), t.enter());
    }

    #[test]
    fn reduced_motion_propagates() {
        let config = OrchestratorConfig {
            reduced_motion: true,
            ..OrchestratorConfig::default()
        };
        assert!(config.to_mount_config().reduced_motion);
        assert!(config.to_focus_config().reduced_motion);
    }

    #[cfg(feature = "policy-config")]
    #[test]
    fn partial_toml_preserves_defaults() {
        let config = OrchestratorConfig::from_toml_str(
            r#"
            [mount]
            mode = "idle"
            unmount_delay_ms = 400

            [focus]
            dwell_ms = 80
            "#,
        )
        .unwrap();
        assert_eq!(config.mount.mode, MountMode::Idle);
        assert_eq!(config.mount.unmount_delay_ms, 400);
        assert_eq!(config.mount.fade_in_ms, 300);
        assert_eq!(config.focus.dwell_ms, 80);
        assert_eq!(config.focus.linger_ms, 200);
        assert_eq!(config.tween, TweenPolicy::default());
    }

    #[cfg(feature = "policy-config")]
    #[test]
    fn json_round_trips_through_file() {
        let mut config = OrchestratorConfig::default();
        config.focus.visibility_floor = 0.35;
        config.visibility.steps = vec![0.25, 0.5];
        let json = serde_json::to_string(&config).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vista.json");
        std::fs::write(&path, json).unwrap();
        let loaded = OrchestratorConfig::from_json_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[cfg(feature = "policy-config")]
    #[test]
    fn bad_toml_reports_parse_error() {
        let err = OrchestratorConfig::from_toml_str("[mount]\nmode = 3").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
        assert!(err.to_string().starts_with("TOML parse error"));
    }

    #[cfg(feature = "policy-config")]
    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = OrchestratorConfig::from_toml_file(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
