#![forbid(unsafe_code)]

//! Visibility sensing with hysteresis.
//!
//! A [`VisibilitySensor`] tracks one element against a scroll root. Each
//! [`measure`](VisibilitySensor::measure) computes the fraction of the
//! element's area inside the root and compares it with the last-seen state:
//!
//! - **Enter** fires when the element was outside and is now intersecting
//!   with `ratio >= enter`.
//! - **Exit** fires when the element was inside and is now either not
//!   intersecting or has `ratio < exit`.
//!
//! Between `exit` and `enter` the sensor keeps its previous state, so a
//! ratio oscillating around a single threshold does not chatter.
//!
//! # Invariants
//!
//! 1. `exit <= enter` always holds; a larger `exit` is clamped down.
//! 2. Enter and exit alternate strictly, starting with enter.
//! 3. A report is produced only on an edge or a step-bucket change.
//! 4. After [`unobserve`](VisibilitySensor::unobserve), `measure` yields nothing.
//!
//! # Failure Modes
//!
//! - Non-finite thresholds collapse to 0.0.
//! - Hosts without observation support get [`SensorUnavailable`].

use std::fmt;

use vista_core::geometry::Rect;

use crate::pane::ElementId;

const STEP_EPSILON: f64 = 1e-9;

// ---------------------------------------------------------------------------
// Thresholds
// ---------------------------------------------------------------------------

/// Enter/exit thresholds plus reporting steps, all in `0.0..=1.0`.
#[derive(Debug, Clone, PartialEq)]
pub struct Thresholds {
    enter: f64,
    exit: f64,
    steps: Vec<f64>,
}

impl Default for Thresholds {
    /// Enter on any intersection, exit when fully outside.
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

impl Thresholds {
    /// Create thresholds; `exit` is clamped to at most `enter`.
    #[must_use]
    pub fn new(enter: f64, exit: f64) -> Self {
        let enter = unit(enter);
        let exit = unit(exit).min(enter);
        let mut t = Self {
            enter,
            exit,
            steps: Vec::new(),
        };
        t.normalize_steps();
        t
    }

    /// Add reporting steps (builder pattern). Steps are deduplicated and sorted.
    #[must_use]
    pub fn with_steps(mut self, steps: impl IntoIterator<Item = f64>) -> Self {
        self.steps.extend(steps.into_iter().map(unit));
        self.normalize_steps();
        self
    }

    /// Ratio at or above which the element enters.
    #[inline]
    #[must_use]
    pub fn enter(&self) -> f64 {
        self.enter
    }

    /// Ratio below which the element exits.
    #[inline]
    #[must_use]
    pub fn exit(&self) -> f64 {
        self.exit
    }

    /// Sorted, deduplicated reporting steps (always contains `enter` and `exit`).
    #[must_use]
    pub fn steps(&self) -> &[f64] {
        &self.steps
    }

    fn bucket(&self, ratio: f64) -> usize {
        self.steps.partition_point(|&s| s <= ratio)
    }

    fn normalize_steps(&mut self) {
        self.steps.push(self.enter);
        self.steps.push(self.exit);
        self.steps.sort_by(f64::total_cmp);
        self.steps.dedup_by(|a, b| (*a - *b).abs() < STEP_EPSILON);
    }
}

fn unit(v: f64) -> f64 {
    if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 }
}

// ---------------------------------------------------------------------------
// Sensor
// ---------------------------------------------------------------------------

/// Observation is not supported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorUnavailable;

impl fmt::Display for SensorUnavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("visibility observation is not supported by the host")
    }
}

impl std::error::Error for SensorUnavailable {}

/// One measurement outcome.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibilityReport {
    /// Fraction of the element's area inside the root.
    pub ratio: f64,
    /// The element just entered.
    pub crossed_enter: bool,
    /// The element just exited.
    pub crossed_exit: bool,
    /// The element overlaps the root at all.
    pub is_intersecting: bool,
}

/// Edge-detecting visibility tracker for one element.
#[derive(Debug, Clone)]
pub struct VisibilitySensor {
    element: ElementId,
    thresholds: Thresholds,
    inside: bool,
    ratio: f64,
    bucket: Option<usize>,
    active: bool,
}

impl VisibilitySensor {
    /// Start observing `element`.
    ///
    /// `observation_supported` is the host capability; without it the caller
    /// must fall back to a non-sensing strategy.
    pub fn observe(
        element: ElementId,
        thresholds: Thresholds,
        observation_supported: bool,
    ) -> Result<Self, SensorUnavailable> {
        if !observation_supported {
            return Err(SensorUnavailable);
        }
        Ok(Self {
            element,
            thresholds,
            inside: false,
            ratio: 0.0,
            bucket: None,
            active: true,
        })
    }

    /// Measure the element against the root viewport.
    pub fn measure(&mut self, element: &Rect, root: &Rect) -> Option<VisibilityReport> {
        if !self.active {
            return None;
        }
        let ratio = element.visible_ratio_in(root);
        let is_intersecting = element.intersection_opt(root).is_some();

        let crossed_enter = !self.inside && is_intersecting && ratio >= self.thresholds.enter;
        let crossed_exit = self.inside && (!is_intersecting || ratio < self.thresholds.exit);
        if crossed_enter {
            self.inside = true;
        } else if crossed_exit {
            self.inside = false;
        }

        let bucket = self.thresholds.bucket(ratio);
        let bucket_changed = self.bucket != Some(bucket);
        self.bucket = Some(bucket);
        self.ratio = ratio;

        (crossed_enter || crossed_exit || bucket_changed).then_some(VisibilityReport {
            ratio,
            crossed_enter,
            crossed_exit,
            is_intersecting,
        })
    }

    /// Stop observing. Later measurements yield nothing.
    pub fn unobserve(&mut self) {
        self.active = false;
    }

    /// Whether the sensor is still observing.
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Last measured ratio.
    #[inline]
    #[must_use]
    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    /// Whether the element is currently considered inside.
    #[inline]
    #[must_use]
    pub fn is_inside(&self) -> bool {
        self.inside
    }

    /// The observed element.
    #[inline]
    #[must_use]
    pub fn element(&self) -> ElementId {
        self.element
    }

    /// Effective thresholds.
    #[must_use]
    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }
}
