//! Scroll-to-button mapping and the injection batch.
//!
//! # Scroll as buttons (for beginners)
//!
//! The core X11 protocol has no scroll-wheel event.  A wheel detent is
//! reported as a press+release of a *button*:
//!
//! | Button | Meaning      |
//! |--------|--------------|
//! | 4      | scroll up    |
//! | 5      | scroll down  |
//! | 6      | scroll left  |
//! | 7      | scroll right |
//!
//! Applications that do not speak a smooth-scrolling protocol count these
//! clicks, so one notch must become exactly one press+release pair.

use crate::domain::scroll::{ScrollAxis, ScrollEvent};
use crate::domain::target::WindowHandle;

/// The four synthetic scroll buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScrollButton {
    Up,
    Down,
    Left,
    Right,
}

impl ScrollButton {
    /// Maps an axis and a delta sign to a button.
    ///
    /// | axis       | sign         | button |
    /// |------------|--------------|--------|
    /// | Vertical   | positive     | Up     |
    /// | Vertical   | non-positive | Down   |
    /// | Horizontal | negative     | Left   |
    /// | Horizontal | non-negative | Right  |
    pub fn for_scroll(axis: ScrollAxis, delta: i32) -> Self {
        match axis {
            ScrollAxis::Vertical if delta > 0 => Self::Up,
            ScrollAxis::Vertical => Self::Down,
            ScrollAxis::Horizontal if delta < 0 => Self::Left,
            ScrollAxis::Horizontal => Self::Right,
        }
    }

    /// X11 core-protocol button number.
    pub fn x11_button(self) -> u32 {
        match self {
            Self::Up => 4,
            Self::Down => 5,
            Self::Left => 6,
            Self::Right => 7,
        }
    }
}

/// A point in the target window's coordinate space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anchor {
    pub x: i32,
    pub y: i32,
}

impl Anchor {
    /// Used when the pointer position relative to the target is unknown.
    pub const FALLBACK: Anchor = Anchor { x: 100, y: 100 };

    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl Default for Anchor {
    fn default() -> Self {
        Self::FALLBACK
    }
}

/// Everything needed to replay one scroll event into a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InjectionBatch {
    pub target: WindowHandle,
    pub button: ScrollButton,
    /// Number of press+release pairs to emit.
    pub repeat: u32,
    pub anchor: Anchor,
}

impl InjectionBatch {
    pub fn new(target: WindowHandle, event: ScrollEvent, anchor: Anchor) -> Self {
        Self {
            target,
            button: ScrollButton::for_scroll(event.axis, event.delta),
            repeat: event.notches(),
            anchor,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.repeat == 0
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
