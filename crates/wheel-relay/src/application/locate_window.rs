//! WindowLocator: finds the target window by class name.
//!
//! The search walks the window tree from the root in pre-order and stops at
//! the first window whose class hint contains the query (case-insensitive).
//! A window whose class hint cannot be read simply does not match; a window
//! whose children cannot be listed is treated as a leaf.  Either way the walk
//! continues with the rest of the tree.
//!
//! # Several matching windows
//!
//! If the target application has more than one window whose class matches,
//! the one earliest in traversal order wins.  That is the bottom-most
//! top-level window in stacking order, which is not necessarily the one the
//! user is looking at.  Pass a more specific class substring (or an explicit
//! window id) in that case.

use wheel_core::{class_hint_matches, depth_first_find, WindowHandle};

use super::platform::WindowSystem;

/// Resolves a class-name query to a window handle.
pub struct WindowLocator<'a, W: ?Sized> {
    windows: &'a W,
}

impl<'a, W: WindowSystem + ?Sized> WindowLocator<'a, W> {
    pub fn new(windows: &'a W) -> Self {
        Self { windows }
    }

    /// Returns the first window whose class hint contains `class_query`.
    ///
    /// Never fails: every query error inside the walk degrades to "no match
    /// here".  Returns `None` when nothing matches.
    pub fn resolve(&self, class_query: &str) -> Option<WindowHandle> {
        if class_query.is_empty() {
            return None;
        }

        let search = depth_first_find(
            self.windows.root_window(),
            |window| self.windows.query_children(window).unwrap_or_default(),
            |window| match self.windows.class_hint(window) {
                Ok(hint) => class_hint_matches(hint.as_slice(), class_query),
                Err(_) => false,
            },
        );
        search.found
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
