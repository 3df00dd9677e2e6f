//! Scroll event model and the raw-event filter.
//!
//! Input devices report wheel rotation as *relative axis* events: a
//! `(type, code, value)` triple where `type` is `EV_REL`, `code` names the
//! axis, and `value` is a signed notch count.  This module turns those raw
//! triples into [`ScrollEvent`]s and decides whether a device is worth
//! listening to at all ([`RelativeAxes::has_scroll_wheel`]).
//!
//! # Why not the high-resolution codes? (for beginners)
//!
//! Modern mice report each detent twice: once on `REL_WHEEL` as a whole notch
//! and once on `REL_WHEEL_HI_RES` in 1/120th units.  Applications that expect
//! legacy button-4/5 clicks only understand whole notches, so the hi-res codes
//! are ignored here.  Forwarding both would double every scroll.

use std::fmt;

/// Linux input event type for relative axis changes (`EV_REL`).
pub const EV_REL: u16 = 0x02;

/// Relative axis code for the horizontal wheel (`REL_HWHEEL`).
pub const REL_HWHEEL: u16 = 0x06;

/// Relative axis code for the vertical wheel (`REL_WHEEL`).
pub const REL_WHEEL: u16 = 0x08;

/// High-resolution vertical wheel (`REL_WHEEL_HI_RES`).  Never forwarded.
pub const REL_WHEEL_HI_RES: u16 = 0x0B;

/// High-resolution horizontal wheel (`REL_HWHEEL_HI_RES`).  Never forwarded.
pub const REL_HWHEEL_HI_RES: u16 = 0x0C;

/// Highest relative axis code defined by the kernel (`REL_MAX`).
const REL_MAX: u16 = 0x0F;

/// The wheel axis a scroll event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScrollAxis {
    Vertical,
    Horizontal,
}

impl ScrollAxis {
    /// Maps a relative axis code to a wheel axis.
    ///
    /// Returns `None` for every code that is not a legacy wheel code,
    /// including the high-resolution variants.
    pub fn from_rel_code(code: u16) -> Option<Self> {
        match code {
            REL_WHEEL => Some(Self::Vertical),
            REL_HWHEEL => Some(Self::Horizontal),
            _ => None,
        }
    }

    /// Returns the kernel relative axis code for this axis.
    pub fn rel_code(self) -> u16 {
        match self {
            Self::Vertical => REL_WHEEL,
            Self::Horizontal => REL_HWHEEL,
        }
    }
}

impl fmt::Display for ScrollAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vertical => f.write_str("vertical"),
            Self::Horizontal => f.write_str("horizontal"),
        }
    }
}

/// One raw event as read from an input device, before any filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawInputEvent {
    /// Event type (`EV_SYN`, `EV_KEY`, `EV_REL`, ...).
    pub event_type: u16,
    /// Type-specific code; for `EV_REL` this is the axis.
    pub code: u16,
    /// Signed value; for wheel axes this is the notch count.
    pub value: i32,
}

impl RawInputEvent {
    /// Convenience constructor for an `EV_REL` event.
    pub fn relative(code: u16, value: i32) -> Self {
        Self { event_type: EV_REL, code, value }
    }
}

/// A wheel movement of `delta` notches along `axis`.
///
/// Positive vertical deltas scroll up; negative horizontal deltas scroll left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollEvent {
    pub axis: ScrollAxis,
    pub delta: i32,
}

impl ScrollEvent {
    /// Filters a raw event down to a scroll event.
    ///
    /// Returns `None` unless the event is `EV_REL` on `REL_WHEEL` or
    /// `REL_HWHEEL` with a non-zero value.
    pub fn from_raw(event: &RawInputEvent) -> Option<Self> {
        if event.event_type != EV_REL || event.value == 0 {
            return None;
        }
        ScrollAxis::from_rel_code(event.code).map(|axis| Self { axis, delta: event.value })
    }

    /// Number of discrete clicks this event represents.
    pub fn notches(&self) -> u32 {
        self.delta.unsigned_abs()
    }
}

/// The set of relative axes a device advertises.
///
/// Stored as a bitmask indexed by axis code; codes above `REL_MAX` are
/// ignored on insert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelativeAxes(u16);

impl RelativeAxes {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an axis code to the set.
    pub fn insert(&mut self, code: u16) {
        if code <= REL_MAX {
            self.0 |= 1 << code;
        }
    }

    /// Returns `true` if `code` is in the set.
    pub fn contains(&self, code: u16) -> bool {
        code <= REL_MAX && self.0 & (1 << code) != 0
    }

    /// Returns `true` if the device has a vertical or horizontal wheel.
    pub fn has_scroll_wheel(&self) -> bool {
        self.contains(REL_WHEEL) || self.contains(REL_HWHEEL)
    }

    /// Returns the wheel axes present in the set, vertical first.
    pub fn scroll_axes(&self) -> Vec<ScrollAxis> {
        [ScrollAxis::Vertical, ScrollAxis::Horizontal]
            .into_iter()
            .filter(|axis| self.contains(axis.rel_code()))
            .collect()
    }
}

impl FromIterator<u16> for RelativeAxes {
    fn from_iter<I: IntoIterator<Item = u16>>(iter: I) -> Self {
        let mut axes = Self::new();
        for code in iter {
            axes.insert(code);
        }
        axes
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
