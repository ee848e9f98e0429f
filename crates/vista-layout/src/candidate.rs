#![forbid(unsafe_code)]

//! Exit-candidate selection for auto-unfocus.
//!
//! While a pane is focused, the user may scroll another pane into view. This
//! module picks which pane (if any) should take over as the exit target.
//!
//! # Algorithm
//!
//! 1. Drop the focused pane and every pane with `ratio < floor`.
//! 2. If the caller names the neighbour the scroll is heading toward and
//!    that neighbour is eligible, pick it.
//! 3. Otherwise pick the eligible pane whose centre is nearest the viewport
//!    centre; ties go to the lower index.
//!
//! # Invariants
//!
//! - The focused pane is never returned.
//! - The result is deterministic for a given sample set.

use vista_core::geometry::Rect;

/// Visibility of one pane at evaluation time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateSample {
    /// Display index in the registry.
    pub index: usize,
    /// Visible ratio (0.0–1.0).
    pub ratio: f64,
    /// Absolute distance between the pane's centre and the viewport centre.
    pub center_distance: f64,
}

impl CandidateSample {
    /// Measure a pane rectangle against the viewport.
    #[must_use]
    pub fn measure(index: usize, pane: &Rect, viewport: &Rect) -> Self {
        Self {
            index,
            ratio: pane.visible_ratio_in(viewport),
            center_distance: (pane.center_y() - viewport.center_y()).abs(),
        }
    }
}

/// Pick the pane that should become the exit target, by display index.
///
/// `toward` is the display index of the focused pane's neighbour in the
/// current scroll direction, if there is one.
#[must_use]
pub fn pick_exit_candidate(
    samples: &[CandidateSample],
    focused_index: usize,
    toward: Option<usize>,
    floor: f64,
) -> Option<usize> {
    let eligible = |s: &&CandidateSample| s.index != focused_index && s.ratio >= floor;

    if let Some(p) = toward
        && samples.iter().filter(eligible).any(|s| s.index == p)
    {
        return Some(p);
    }

    let mut best: Option<&CandidateSample> = None;
    for s in samples.iter().filter(eligible) {
        let better = best.is_none_or(|b| {
            s.center_distance < b.center_distance
                || (s.center_distance == b.center_distance && s.index < b.index)
        });
        if better {
            best = Some(s);
        }
    }
    best.map(|s| s.index)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(index: usize, ratio: f64, center_distance: f64) -> CandidateSample {
        CandidateSample {
            index,
            ratio,
            center_distance,
        }
    }

    #[test]
    fn focused_pane_never_picked() {
        let samples = [sample(1, 1.0, 0.0)];
        assert_eq!(pick_exit_candidate(&samples, 1, Some(2), 0.2), None);
    }

    #[test]
    fn below_floor_is_ignored() {
        let samples = [sample(1, 0.9, 0.0), sample(2, 0.1, 10.0)];
        assert_eq!(pick_exit_candidate(&samples, 1, Some(2), 0.2), None);
    }

    #[test]
    fn nearest_center_wins_without_direction() {
        let samples = [sample(0, 0.3, 200.0), sample(2, 0.3, 150.0), sample(3, 0.5, 90.0)];
        assert_eq!(pick_exit_candidate(&samples, 1, None, 0.2), Some(3));
    }

    #[test]
    fn adjacent_in_direction_preferred() {
        let samples = [sample(0, 0.8, 10.0), sample(2, 0.25, 250.0)];
        assert_eq!(pick_exit_candidate(&samples, 1, Some(2), 0.2), Some(2));
        assert_eq!(pick_exit_candidate(&samples, 1, Some(0), 0.2), Some(0));
    }

    #[test]
    fn ineligible_neighbour_falls_back_to_nearest() {
        let samples = [sample(0, 0.8, 10.0), sample(2, 0.1, 250.0)];
        assert_eq!(pick_exit_candidate(&samples, 1, Some(2), 0.2), Some(0));
    }

    #[test]
    fn measure_uses_viewport_center() {
        let viewport = Rect::from_size(800.0, 600.0);
        let pane = Rect::new(0.0, 450.0, 800.0, 600.0);
        let s = CandidateSample::measure(4, &pane, &viewport);
        assert_eq!(s.index, 4);
        assert!((s.ratio - 0.25).abs() < 1e-9);
        assert!((s.center_distance - 450.0).abs() < 1e-9);
    }
}
