#![forbid(unsafe_code)]

//! A simulated scroll root with vertically stacked panes.
//!
//! Pane `i` is addressed by `ElementId(i)`. Offsets are the running sum of
//! the heights above a pane; the scroll position is clamped to
//! `[0, content_height - viewport_height]` like a real scroll root.
//!
//! Programmatic writes (through [`ScrollContainer`]) are recorded in a
//! [`TransitionRecord`]; user scrolling ([`SimulatedPage::user_scroll_to`])
//! moves the page without being recorded.

use vista_layout::{ElementId, Rect};
use vista_runtime::{ScrollBehavior, ScrollContainer, SnapMode};

/// One recorded change to the scroll root.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transition {
    /// A programmatic scroll write, after clamping.
    ScrollWrite(f64),
    /// The snap discipline changed.
    Snap(SnapMode),
    /// The native scroll behavior changed.
    Behavior(ScrollBehavior),
}

/// Ordered log of programmatic changes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransitionRecord {
    entries: Vec<Transition>,
}

impl TransitionRecord {
    /// All entries in order.
    #[must_use]
    pub fn entries(&self) -> &[Transition] {
        &self.entries
    }

    /// Scroll writes in order.
    #[must_use]
    pub fn writes(&self) -> Vec<f64> {
        self.entries
            .iter()
            .filter_map(|t| match t {
                Transition::ScrollWrite(top) => Some(*top),
                _ => None,
            })
            .collect()
    }

    /// Snap modes in the order they were set, with repeats collapsed.
    #[must_use]
    pub fn snap_history(&self) -> Vec<SnapMode> {
        let mut out: Vec<SnapMode> = Vec::new();
        for t in &self.entries {
            if let Transition::Snap(mode) = t
                && out.last() != Some(mode)
            {
                out.push(*mode);
            }
        }
        out
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forget everything recorded so far.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn push(&mut self, t: Transition) {
        #[cfg(feature = "tracing")]
        tracing::trace!(target: "vista.web", transition = ?t, "page transition");
        self.entries.push(t);
    }
}

/// Simulated scroll root.
#[derive(Debug, Clone)]
pub struct SimulatedPage {
    heights: Vec<f64>,
    width: f64,
    viewport_height: f64,
    top: f64,
    snap: SnapMode,
    behavior: ScrollBehavior,
    record: TransitionRecord,
}

impl SimulatedPage {
    /// Create a page with the given pane heights.
    ///
    /// Starts at the top with mandatory snapping and smooth native scrolling.
    #[must_use]
    pub fn new(heights: impl IntoIterator<Item = f64>, width: f64, viewport_height: f64) -> Self {
        Self {
            heights: heights.into_iter().map(|h| h.max(0.0)).collect(),
            width: width.max(0.0),
            viewport_height: viewport_height.max(0.0),
            top: 0.0,
            snap: SnapMode::Mandatory,
            behavior: ScrollBehavior::Smooth,
            record: TransitionRecord::default(),
        }
    }

    /// `count` panes of equal height.
    #[must_use]
    pub fn uniform(count: usize, pane_height: f64, viewport_height: f64) -> Self {
        Self::new(std::iter::repeat_n(pane_height, count), 1280.0, viewport_height)
    }

    /// Element handle of pane `index`.
    #[must_use]
    pub fn element(index: usize) -> ElementId {
        ElementId(index as u64)
    }

    /// Total content height.
    #[must_use]
    pub fn content_height(&self) -> f64 {
        self.heights.iter().sum()
    }

    /// Largest valid scroll position.
    #[must_use]
    pub fn max_scroll(&self) -> f64 {
        (self.content_height() - self.viewport_height).max(0.0)
    }

    /// Offset of pane `index` from the content top.
    #[must_use]
    pub fn offset_of(&self, index: usize) -> Option<f64> {
        (index < self.heights.len()).then(|| self.heights[..index].iter().sum())
    }

    /// Resize pane `index`. Returns `false` for an unknown index.
    pub fn set_pane_height(&mut self, index: usize, height: f64) -> bool {
        let Some(slot) = self.heights.get_mut(index) else {
            return false;
        };
        *slot = height.max(0.0);
        self.top = self.top.clamp(0.0, self.max_scroll());
        true
    }

    /// Move the page as the user would. Not recorded.
    pub fn user_scroll_to(&mut self, top: f64) {
        self.top = top.clamp(0.0, self.max_scroll());
    }

    /// Move the page by `dy` as the user would. Not recorded.
    pub fn user_scroll_by(&mut self, dy: f64) {
        self.user_scroll_to(self.top + dy);
    }

    /// Recorded programmatic changes.
    #[must_use]
    pub fn record(&self) -> &TransitionRecord {
        &self.record
    }

    /// Recorded programmatic changes, mutably (e.g. to clear).
    pub fn record_mut(&mut self) -> &mut TransitionRecord {
        &mut self.record
    }

    fn index_of(element: ElementId) -> Option<usize> {
        usize::try_from(element.0).ok()
    }
}

impl ScrollContainer for SimulatedPage {
    fn scroll_top(&self) -> f64 {
        self.top
    }

    fn set_scroll_top(&mut self, top: f64) {
        self.top = top.clamp(0.0, self.max_scroll());
        self.record.push(Transition::ScrollWrite(self.top));
    }

    fn viewport(&self) -> Rect {
        Rect::from_size(self.width, self.viewport_height)
    }

    fn scroll_behavior(&self) -> ScrollBehavior {
        self.behavior
    }

    fn set_scroll_behavior(&mut self, behavior: ScrollBehavior) {
        self.behavior = behavior;
        self.record.push(Transition::Behavior(behavior));
    }

    fn snap_mode(&self) -> SnapMode {
        self.snap
    }

    fn set_snap_mode(&mut self, mode: SnapMode) {
        self.snap = mode;
        self.record.push(Transition::Snap(mode));
    }

    fn element_offset(&self, element: ElementId) -> Option<f64> {
        self.offset_of(Self::index_of(element)?)
    }

    fn element_rect(&self, element: ElementId) -> Option<Rect> {
        let index = Self::index_of(element)?;
        let offset = self.offset_of(index)?;
        Some(Rect::new(0.0, offset - self.top, self.width, self.heights[index]))
    }
}
