//! VisibilityTracker and ExistenceTracker: two cheap probes on the held
//! target window.
//!
//! They resolve uncertainty in opposite directions:
//!
//! | Probe      | Query failed with `BadWindow` | Any other failure |
//! |------------|-------------------------------|-------------------|
//! | visible?   | `false`                       | `false`           |
//! | exists?    | `false`                       | `true`            |
//!
//! Not knowing whether the window is on screen must never cause an
//! injection, while not knowing whether it still exists must never end the
//! session.  Only a definitive "no such window" does that.

use wheel_core::WindowHandle;

use super::platform::{MapState, WindowSystem};

/// Answers "is the target currently on screen?".
pub struct VisibilityTracker<'a, W: ?Sized> {
    windows: &'a W,
}

impl<'a, W: WindowSystem + ?Sized> VisibilityTracker<'a, W> {
    pub fn new(windows: &'a W) -> Self {
        Self { windows }
    }

    /// `true` only if the attribute query succeeds and reports `Viewable`.
    pub fn is_active(&self, window: WindowHandle) -> bool {
        matches!(self.windows.map_state(window), Ok(MapState::Viewable))
    }
}

/// Answers "does the target still exist at all?".
pub struct ExistenceTracker<'a, W: ?Sized> {
    windows: &'a W,
}

impl<'a, W: WindowSystem + ?Sized> ExistenceTracker<'a, W> {
    pub fn new(windows: &'a W) -> Self {
        Self { windows }
    }

    /// `false` only when the server says the window does not exist.
    pub fn exists(&self, window: WindowHandle) -> bool {
        match self.windows.geometry(window) {
            Ok(_) => true,
            Err(e) => !e.is_no_such_window(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
