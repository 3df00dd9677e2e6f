//! In-memory window tree for unit and integration tests.
//!
//! # Why a mock window system?
//!
//! The real [`X11WindowSystem`](super::linux::X11WindowSystem) needs a
//! running X server, and any click it synthesizes lands on the developer's
//! desktop.  `MockWindowSystem` keeps a small tree of fake windows instead
//! and records every click and flush so tests can assert exactly what was
//! sent, and in which order.
//!
//! All methods take `&self`; state lives behind a `Mutex`, so a test can keep
//! mutating the tree (map, unmap, destroy) while the code under test holds a
//! shared reference to it.
//!
//! # Usage in tests
//!
//! ```ignore
//! let ws = MockWindowSystem::new();
//! ws.add_window(ws.root_window(), WindowHandle(10), &["xterm", "XTerm"]);
//!
//! ScrollInjector::new(&ws, Anchor::FALLBACK)
//!     .inject(ScrollAxis::Vertical, 2, Some(WindowHandle(10)))?;
//!
//! assert_eq!(ws.button_calls().len(), 4);
//! assert_eq!(ws.flush_count(), 1);
//! ```

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use wheel_core::{Anchor, ScrollButton, WindowHandle};

use crate::application::platform::{Geometry, MapState, WindowQueryError, WindowSystem};

/// Handle of the mock root window.
pub const MOCK_ROOT: WindowHandle = WindowHandle(1);

/// Pointer position reported for a window unless a test overrides it.
pub const DEFAULT_POINTER: Anchor = Anchor { x: 50, y: 50 };

/// One recorded `fake_button` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonCall {
    pub target: WindowHandle,
    pub button: ScrollButton,
    pub pressed: bool,
    pub at: Anchor,
}

struct MockWindow {
    parent: Option<WindowHandle>,
    children: Vec<WindowHandle>,
    class: Vec<String>,
    map_state: MapState,
    pointer: Option<Anchor>,
    class_hint_fails: bool,
    children_fail: bool,
    map_state_error: Option<WindowQueryError>,
    geometry_error: Option<WindowQueryError>,
}

impl MockWindow {
    fn new(parent: Option<WindowHandle>, class: &[&str]) -> Self {
        Self {
            parent,
            children: Vec::new(),
            class: class.iter().map(|s| s.to_string()).collect(),
            map_state: MapState::Viewable,
            pointer: Some(DEFAULT_POINTER),
            class_hint_fails: false,
            children_fail: false,
            map_state_error: None,
            geometry_error: None,
        }
    }
}

#[derive(Default)]
struct MockState {
    windows: HashMap<WindowHandle, MockWindow>,
    buttons: Vec<ButtonCall>,
    button_error: Option<WindowQueryError>,
    flushes: usize,
    class_hint_calls: usize,
}

impl MockState {
    fn window(&self, handle: WindowHandle) -> Result<&MockWindow, WindowQueryError> {
        self.windows
            .get(&handle)
            .ok_or(WindowQueryError::NoSuchWindow(handle))
    }

    fn window_mut(&mut self, handle: WindowHandle) -> Option<&mut MockWindow> {
        self.windows.get_mut(&handle)
    }
}

/// A fake display server.
pub struct MockWindowSystem {
    state: Mutex<MockState>,
}

impl MockWindowSystem {
    /// A display with only a root window (which has no class hint).
    pub fn new() -> Self {
        let mut state = MockState::default();
        state.windows.insert(MOCK_ROOT, MockWindow::new(None, &[]));
        Self {
            state: Mutex::new(state),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Adds a viewable window as the last (top-most) child of `parent`.
    ///
    /// # Panics
    ///
    /// If `parent` does not exist.
    pub fn add_window(&self, parent: WindowHandle, handle: WindowHandle, class: &[&str]) {
        let mut state = self.lock();
        state
            .window_mut(parent)
            .unwrap_or_else(|| panic!("mock parent window {parent} does not exist"))
            .children
            .push(handle);
        state.windows.insert(handle, MockWindow::new(Some(parent), class));
    }

    /// Removes `handle` and its whole subtree.  Later queries on any of them
    /// fail with `NoSuchWindow`.
    pub fn destroy(&self, handle: WindowHandle) {
        let mut state = self.lock();
        let Some(window) = state.windows.get(&handle) else {
            return;
        };
        if let Some(parent) = window.parent {
            if let Some(parent) = state.window_mut(parent) {
                parent.children.retain(|&child| child != handle);
            }
        }

        let mut doomed = vec![handle];
        while let Some(next) = doomed.pop() {
            if let Some(removed) = state.windows.remove(&next) {
                doomed.extend(removed.children);
            }
        }
    }

    pub fn set_map_state(&self, handle: WindowHandle, map_state: MapState) {
        if let Some(window) = self.lock().window_mut(handle) {
            window.map_state = map_state;
        }
    }

    /// `None` makes the pointer query for `handle` fail.
    pub fn set_pointer(&self, handle: WindowHandle, pointer: Option<Anchor>) {
        if let Some(window) = self.lock().window_mut(handle) {
            window.pointer = pointer;
        }
    }

    /// Makes the class-hint query for `handle` fail.
    pub fn fail_class_hint(&self, handle: WindowHandle) {
        if let Some(window) = self.lock().window_mut(handle) {
            window.class_hint_fails = true;
        }
    }

    /// Makes the child listing of `handle` fail.
    pub fn fail_children(&self, handle: WindowHandle) {
        if let Some(window) = self.lock().window_mut(handle) {
            window.children_fail = true;
        }
    }

    /// Makes every attribute query on `handle` fail with `error`.
    pub fn fail_map_state(&self, handle: WindowHandle, error: WindowQueryError) {
        if let Some(window) = self.lock().window_mut(handle) {
            window.map_state_error = Some(error);
        }
    }

    /// Makes every geometry query on `handle` fail with `error`.
    pub fn fail_geometry(&self, handle: WindowHandle, error: WindowQueryError) {
        if let Some(window) = self.lock().window_mut(handle) {
            window.geometry_error = Some(error);
        }
    }

    /// Makes every `fake_button` call fail with `error`.
    pub fn fail_buttons(&self, error: WindowQueryError) {
        self.lock().button_error = Some(error);
    }

    /// Every `fake_button` call that succeeded, in order.
    pub fn button_calls(&self) -> Vec<ButtonCall> {
        self.lock().buttons.clone()
    }

    pub fn flush_count(&self) -> usize {
        self.lock().flushes
    }

    /// Number of `class_hint` queries made so far.
    pub fn class_hint_calls(&self) -> usize {
        self.lock().class_hint_calls
    }
}

impl Default for MockWindowSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowSystem for MockWindowSystem {
    fn root_window(&self) -> WindowHandle {
        MOCK_ROOT
    }

    fn query_children(&self, window: WindowHandle) -> Result<Vec<WindowHandle>, WindowQueryError> {
        let state = self.lock();
        let node = state.window(window)?;
        if node.children_fail {
            return Err(WindowQueryError::Protocol {
                request: "XQueryTree",
                window,
                code: 11,
            });
        }
        Ok(node.children.clone())
    }

    fn class_hint(&self, window: WindowHandle) -> Result<Vec<String>, WindowQueryError> {
        let mut state = self.lock();
        state.class_hint_calls += 1;
        let node = state.window(window)?;
        if node.class_hint_fails {
            return Err(WindowQueryError::Protocol {
                request: "XGetClassHint",
                window,
                code: 11,
            });
        }
        Ok(node.class.clone())
    }

    fn map_state(&self, window: WindowHandle) -> Result<MapState, WindowQueryError> {
        let state = self.lock();
        let node = state.window(window)?;
        match &node.map_state_error {
            Some(error) => Err(error.clone()),
            None => Ok(node.map_state),
        }
    }

    fn geometry(&self, window: WindowHandle) -> Result<Geometry, WindowQueryError> {
        let state = self.lock();
        let node = state.window(window)?;
        match &node.geometry_error {
            Some(error) => Err(error.clone()),
            None => Ok(Geometry {
                x: 0,
                y: 0,
                width: 640,
                height: 480,
            }),
        }
    }

    fn pointer_position(&self, window: WindowHandle) -> Result<Anchor, WindowQueryError> {
        let state = self.lock();
        state.window(window)?.pointer.ok_or(WindowQueryError::Unavailable {
            request: "XQueryPointer",
            window,
        })
    }

    fn fake_button(
        &self,
        target: WindowHandle,
        button: ScrollButton,
        pressed: bool,
        at: Anchor,
    ) -> Result<(), WindowQueryError> {
        let mut state = self.lock();
        if let Some(error) = &state.button_error {
            return Err(error.clone());
        }
        state.buttons.push(ButtonCall {
            target,
            button,
            pressed,
            at,
        });
        Ok(())
    }

    fn flush(&self) -> Result<(), WindowQueryError> {
        self.lock().flushes += 1;
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
