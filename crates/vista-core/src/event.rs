#![forbid(unsafe_code)]

//! Canonical input event types.
//!
//! The host translates its native pointer, wheel, touch and keyboard events
//! into [`InputEvent`] before handing them to the orchestrator. Every event
//! here represents *direct user input*; programmatic scroll writes never
//! produce one.
//!
//! # Design Notes
//!
//! - Pointer coordinates are viewport pixels, origin at top-left.
//! - Wheel deltas follow the DOM convention: positive `dy` scrolls down.
//! - `DragIntent` is synthesized by [`GestureRecognizer`](crate::gesture::GestureRecognizer)
//!   or reported directly by hosts that detect drag-to-scroll themselves.

use bitflags::bitflags;

/// Canonical input event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// A pointer (mouse or pen) event.
    Pointer(PointerEvent),

    /// A wheel or trackpad scroll gesture.
    Wheel {
        /// Horizontal delta in pixels.
        dx: f64,
        /// Vertical delta in pixels (positive = down).
        dy: f64,
    },

    /// A touch contact changed.
    Touch(TouchPhase),

    /// A keyboard event.
    Key(KeyEvent),

    /// The user started dragging content (synthesized).
    DragIntent,
}

impl InputEvent {
    /// Whether this event counts as the user taking over scrolling.
    ///
    /// Pointer *moves* without a pressed button are hover noise and do not
    /// count; everything else does. Key releases are ignored so that a key
    /// held before a tween started cannot cancel it on release.
    #[must_use]
    pub fn is_user_takeover(&self) -> bool {
        match self {
            Self::Pointer(p) => !matches!(p.kind, PointerEventKind::Moved),
            Self::Key(k) => k.kind != KeyEventKind::Release,
            Self::Wheel { .. } | Self::Touch(_) | Self::DragIntent => true,
        }
    }
}

/// A pointer event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    /// The type of pointer event.
    pub kind: PointerEventKind,
    /// X coordinate in viewport pixels.
    pub x: f64,
    /// Y coordinate in viewport pixels.
    pub y: f64,
    /// Modifier keys held during the event.
    pub modifiers: Modifiers,
}

impl PointerEvent {
    /// Create a new pointer event.
    #[must_use]
    pub const fn new(kind: PointerEventKind, x: f64, y: f64) -> Self {
        Self {
            kind,
            x,
            y,
            modifiers: Modifiers::NONE,
        }
    }

    /// Create a pointer event with modifiers.
    #[must_use]
    pub const fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }
}

/// The type of pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerEventKind {
    /// Button pressed.
    Down,
    /// Button released.
    Up,
    /// Moved while a button is held.
    Drag,
    /// Moved with no button held.
    Moved,
}

/// Touch lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TouchPhase {
    /// A finger touched the surface.
    Start,
    /// A finger moved.
    Move,
    /// A finger lifted.
    End,
    /// The platform cancelled the touch.
    Cancel,
}

/// A keyboard event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    /// The key code.
    pub code: KeyCode,
    /// Modifier keys held during the event.
    pub modifiers: Modifiers,
    /// Press, repeat, or release.
    pub kind: KeyEventKind,
}

impl KeyEvent {
    /// Create a key press with no modifiers.
    #[must_use]
    pub const fn new(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: Modifiers::NONE,
            kind: KeyEventKind::Press,
        }
    }

    /// Create a key event with a specific kind.
    #[must_use]
    pub const fn with_kind(mut self, kind: KeyEventKind) -> Self {
        self.kind = kind;
        self
    }

    /// Whether this key scrolls the page when not intercepted.
    #[must_use]
    pub const fn is_scroll_key(&self) -> bool {
        matches!(
            self.code,
            KeyCode::Up
                | KeyCode::Down
                | KeyCode::PageUp
                | KeyCode::PageDown
                | KeyCode::Home
                | KeyCode::End
                | KeyCode::Space
        )
    }
}

/// Key codes relevant to scroll choreography.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    /// A regular character key.
    Char(char),
    /// Space bar.
    Space,
    /// Escape key.
    Escape,
    /// Enter/Return key.
    Enter,
    /// Tab key.
    Tab,
    /// Up arrow.
    Up,
    /// Down arrow.
    Down,
    /// Page Up.
    PageUp,
    /// Page Down.
    PageDown,
    /// Home.
    Home,
    /// End.
    End,
}

/// The type of key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum KeyEventKind {
    /// Key was pressed (default when not distinguishable).
    #[default]
    Press,
    /// Key is being held.
    Repeat,
    /// Key was released.
    Release,
}

bitflags! {
    /// Modifier keys that can be held during an event.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        /// No modifiers.
        const NONE  = 0b0000;
        /// Shift key.
        const SHIFT = 0b0001;
        /// Alt/Option key.
        const ALT   = 0b0010;
        /// Control key.
        const CTRL  = 0b0100;
        /// Super/Meta/Command key.
        const SUPER = 0b1000;
    }
}

impl Default for Modifiers {
    fn default() -> Self {
        Self::NONE
    }
}
