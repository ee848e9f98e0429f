#![forbid(unsafe_code)]

//! Gesture recognition: drag-intent synthesis and scroll-direction tracking.
//!
//! [`GestureRecognizer`] watches raw pointer and touch input and synthesizes
//! a single [`InputEvent::DragIntent`] once a press moves past a distance
//! threshold. [`ScrollDirectionTracker`] turns successive scroll offsets into
//! a stable [`ScrollDirection`].
//!
//! # State Machine
//!
//! - **Drag detector**: pointer-down (or touch-start) arms the tracker;
//!   movement beyond `drag_threshold` emits `DragIntent` exactly once;
//!   pointer-up / touch-end / Escape disarms it.
//! - **Direction tracker**: offsets that move less than `dead_band` from the
//!   last anchor are ignored, so sub-pixel jitter never flips direction.
//!
//! # Invariants
//!
//! 1. At most one `DragIntent` per press.
//! 2. Direction only changes after a movement larger than the dead band.
//! 3. After `reset()`, both detectors return to idle.

use crate::event::{InputEvent, KeyCode, PointerEventKind, TouchPhase};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Thresholds for gesture recognition.
#[derive(Debug, Clone)]
pub struct GestureConfig {
    /// Minimum euclidean distance (px) before a press becomes a drag (default: 6).
    pub drag_threshold: f64,
    /// Movement below this many pixels does not change scroll direction (default: 2).
    pub direction_dead_band: f64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            drag_threshold: 6.0,
            direction_dead_band: 2.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Drag detection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct DragTracker {
    start: (f64, f64),
    fired: bool,
}

/// Stateful recognizer that synthesizes drag intent from raw input.
#[derive(Debug, Clone, Default)]
pub struct GestureRecognizer {
    config: GestureConfig,
    drag: Option<DragTracker>,
    touch_active: bool,
}

impl GestureRecognizer {
    /// Create a recognizer with the given configuration.
    #[must_use]
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            drag: None,
            touch_active: false,
        }
    }

    /// Process a raw event, returning a synthesized `DragIntent` if one fires.
    pub fn process(&mut self, event: &InputEvent) -> Option<InputEvent> {
        match event {
            InputEvent::Pointer(p) => match p.kind {
                PointerEventKind::Down => {
                    self.drag = Some(DragTracker {
                        start: (p.x, p.y),
                        fired: false,
                    });
                    None
                }
                PointerEventKind::Drag => self.on_move(p.x, p.y),
                PointerEventKind::Up => {
                    self.drag = None;
                    None
                }
                PointerEventKind::Moved => None,
            },
            InputEvent::Touch(phase) => {
                match phase {
                    TouchPhase::Start => self.touch_active = true,
                    TouchPhase::Move if self.touch_active => {
                        // Touch moves carry no coordinates here; a moving
                        // finger is already a drag.
                        self.touch_active = false;
                        return Some(InputEvent::DragIntent);
                    }
                    TouchPhase::Move => {}
                    TouchPhase::End | TouchPhase::Cancel => self.touch_active = false,
                }
                None
            }
            InputEvent::Key(k) if k.code == KeyCode::Escape => {
                self.reset();
                None
            }
            _ => None,
        }
    }

    fn on_move(&mut self, x: f64, y: f64) -> Option<InputEvent> {
        let drag = self.drag.as_mut()?;
        if drag.fired {
            return None;
        }
        let (sx, sy) = drag.start;
        let dist = ((x - sx).powi(2) + (y - sy).powi(2)).sqrt();
        if dist >= self.config.drag_threshold {
            drag.fired = true;
            return Some(InputEvent::DragIntent);
        }
        None
    }

    /// Whether a press is currently being tracked.
    #[inline]
    #[must_use]
    pub fn is_pressed(&self) -> bool {
        self.drag.is_some() || self.touch_active
    }

    /// Reset all gesture state to idle.
    pub fn reset(&mut self) {
        self.drag = None;
        self.touch_active = false;
    }

    /// Get a reference to the current configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &GestureConfig {
        &self.config
    }
}

// ---------------------------------------------------------------------------
// Scroll direction
// ---------------------------------------------------------------------------

/// Vertical scroll direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ScrollDirection {
    /// No movement observed yet.
    #[default]
    Still,
    /// Offset decreasing (content moves down, earlier panes approach).
    Up,
    /// Offset increasing (later panes approach).
    Down,
}

/// Derives scroll direction from successive offsets with a dead band.
#[derive(Debug, Clone, Default)]
pub struct ScrollDirectionTracker {
    dead_band: f64,
    anchor: Option<f64>,
    direction: ScrollDirection,
}

impl ScrollDirectionTracker {
    /// Create a tracker with the given dead band in pixels.
    #[must_use]
    pub fn new(dead_band: f64) -> Self {
        Self {
            dead_band: dead_band.max(0.0),
            anchor: None,
            direction: ScrollDirection::Still,
        }
    }

    /// Record a new scroll offset and return the current direction.
    pub fn observe(&mut self, offset: f64) -> ScrollDirection {
        let Some(anchor) = self.anchor else {
            self.anchor = Some(offset);
            return self.direction;
        };
        let delta = offset - anchor;
        if delta.abs() > self.dead_band {
            self.direction = if delta > 0.0 {
                ScrollDirection::Down
            } else {
                ScrollDirection::Up
            };
            self.anchor = Some(offset);
        }
        self.direction
    }

    /// Forget history, e.g. after a programmatic scroll.
    pub fn reset_to(&mut self, offset: f64) {
        self.anchor = Some(offset);
        self.direction = ScrollDirection::Still;
    }

    /// Last derived direction.
    #[inline]
    #[must_use]
    pub fn direction(&self) -> ScrollDirection {
        self.direction
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
