//! Xlib/XTest implementation of [`WindowSystem`].
//!
//! # Error trapping (for beginners)
//!
//! Xlib reports protocol errors asynchronously through a process-wide error
//! handler.  The default handler prints the error and calls `exit()`, which
//! is unacceptable here: querying a window that has just been destroyed
//! (`BadWindow`) is a normal event for this program.
//!
//! [`X11WindowSystem::connect`] therefore installs [`trap_error`], which only
//! records the error code in a static.  Every request clears the slot first
//! and inspects it afterwards:
//!
//! | Trapped code            | Result                               |
//! |-------------------------|--------------------------------------|
//! | `BadWindow`/`BadDrawable` | [`WindowQueryError::NoSuchWindow`] |
//! | any other               | [`WindowQueryError::Protocol`]       |
//! | none, but status 0      | [`WindowQueryError::Unavailable`]    |
//!
//! Requests that wait for a reply (`XQueryTree`, `XGetGeometry`, ...) have
//! their error delivered before the call returns.  Requests without a reply
//! (`XTestFakeButtonEvent`, `XSendEvent`) surface their errors at the next
//! `XSync`, which is why [`WindowSystem::flush`] syncs instead of flushing.
//!
//! # Threading
//!
//! The `Display` pointer is not `Send`.  The binary opens the connection on
//! the blocking engine thread and never moves it.

use std::ffi::CStr;
use std::os::raw::{c_char, c_int, c_long, c_uint, c_ulong};
use std::ptr;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

use thiserror::Error;
use tracing::debug;
use wheel_core::{Anchor, ScrollButton, WindowHandle};
use x11::{xlib, xtest};

use super::InjectionMode;
use crate::application::platform::{Geometry, MapState, WindowQueryError, WindowSystem};

/// X protocol error codes (X.h).
const BAD_WINDOW: u8 = 3;
const BAD_DRAWABLE: u8 = 9;

/// `CurrentTime`: let the server stamp synthetic events.
const CURRENT_TIME: c_ulong = 0;

/// 0 means "no error trapped".  X error codes start at 1.
static TRAPPED_CODE: AtomicU8 = AtomicU8::new(0);
static TRAPPED_RESOURCE: AtomicU64 = AtomicU64::new(0);

unsafe extern "C" fn trap_error(_display: *mut xlib::Display, event: *mut xlib::XErrorEvent) -> c_int {
    if let Some(event) = event.as_ref() {
        TRAPPED_CODE.store(event.error_code, Ordering::SeqCst);
        TRAPPED_RESOURCE.store(event.resourceid as u64, Ordering::SeqCst);
    }
    0
}

fn clear_trap() {
    TRAPPED_CODE.store(0, Ordering::SeqCst);
    TRAPPED_RESOURCE.store(0, Ordering::SeqCst);
}

/// Returns the error code trapped since the last [`clear_trap`], if any.
fn take_trap() -> Option<u8> {
    match TRAPPED_CODE.swap(0, Ordering::SeqCst) {
        0 => None,
        code => Some(code),
    }
}

/// Maps a trapped error code and a request's status to a classified error.
fn classify(request: &'static str, window: WindowHandle, trapped: Option<u8>, status: c_int) -> Result<(), WindowQueryError> {
    match trapped {
        Some(BAD_WINDOW) | Some(BAD_DRAWABLE) => Err(WindowQueryError::NoSuchWindow(window)),
        Some(code) => Err(WindowQueryError::Protocol { request, window, code }),
        None if status == 0 => Err(WindowQueryError::Unavailable { request, window }),
        None => Ok(()),
    }
}

/// Errors opening the display connection.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("cannot open X display (DISPLAY={0})")]
    NoDisplay(String),

    #[error("the X server does not support the XTEST extension")]
    XTestMissing,
}

/// A live Xlib connection.  Closed on drop.
pub struct X11WindowSystem {
    display: *mut xlib::Display,
    root: xlib::Window,
    mode: InjectionMode,
}

impl X11WindowSystem {
    /// Opens the display named by `$DISPLAY` and installs the error trap.
    ///
    /// # Errors
    ///
    /// [`ConnectError::NoDisplay`] if the server is unreachable, and
    /// [`ConnectError::XTestMissing`] if `mode` is XTest but the extension is
    /// not available.
    pub fn connect(mode: InjectionMode) -> Result<Self, ConnectError> {
        // SAFETY: a null name selects $DISPLAY; the result is checked below.
        let display = unsafe { xlib::XOpenDisplay(ptr::null()) };
        if display.is_null() {
            let name = std::env::var("DISPLAY").unwrap_or_else(|_| "<unset>".to_string());
            return Err(ConnectError::NoDisplay(name));
        }

        // SAFETY: `display` is a valid connection from here on.
        let root = unsafe {
            xlib::XSetErrorHandler(Some(trap_error));
            xlib::XDefaultRootWindow(display)
        };

        let system = Self { display, root, mode };
        if mode == InjectionMode::XTest && !system.has_xtest() {
            return Err(ConnectError::XTestMissing);
        }
        debug!(root = %WindowHandle(root as u64), %mode, "connected to X display");
        Ok(system)
    }

    fn has_xtest(&self) -> bool {
        let (mut event_base, mut error_base, mut major, mut minor) = (0, 0, 0, 0);
        // SAFETY: valid display; out-pointers reference locals.
        let present = unsafe {
            xtest::XTestQueryExtension(self.display, &mut event_base, &mut error_base, &mut major, &mut minor)
        };
        present != 0
    }

    fn send_button_event(&self, target: WindowHandle, button: ScrollButton, pressed: bool, at: Anchor) -> c_int {
        let (event_type, mask) = if pressed {
            (xlib::ButtonPress, xlib::ButtonPressMask)
        } else {
            (xlib::ButtonRelease, xlib::ButtonReleaseMask)
        };
        let window = target.id() as xlib::Window;

        let button_event = xlib::XButtonEvent {
            type_: event_type,
            serial: 0,
            send_event: xlib::True,
            display: self.display,
            window,
            root: self.root,
            subwindow: 0,
            time: CURRENT_TIME,
            x: at.x,
            y: at.y,
            x_root: at.x,
            y_root: at.y,
            state: 0,
            button: button.x11_button() as c_uint,
            same_screen: xlib::True,
        };
        let mut event = xlib::XEvent { button: button_event };

        // SAFETY: valid display; `event` is a fully initialised XEvent that
        // lives for the duration of the call.
        unsafe { xlib::XSendEvent(self.display, window, xlib::True, mask as c_long, &mut event) }
    }
}

impl Drop for X11WindowSystem {
    fn drop(&mut self) {
        // SAFETY: `display` came from XOpenDisplay and is closed exactly once.
        unsafe {
            xlib::XCloseDisplay(self.display);
        }
    }
}

/// Copies an Xlib-owned C string and frees it.
///
/// # Safety
///
/// `ptr` must be null or a string allocated by Xlib.
unsafe fn take_xstring(ptr: *mut c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    let value = CStr::from_ptr(ptr).to_string_lossy().into_owned();
    xlib::XFree(ptr.cast());
    Some(value)
}

impl WindowSystem for X11WindowSystem {
    fn root_window(&self) -> WindowHandle {
        WindowHandle(self.root as u64)
    }

    fn query_children(&self, window: WindowHandle) -> Result<Vec<WindowHandle>, WindowQueryError> {
        let mut root_return: xlib::Window = 0;
        let mut parent_return: xlib::Window = 0;
        let mut children: *mut xlib::Window = ptr::null_mut();
        let mut count: c_uint = 0;

        clear_trap();
        // SAFETY: valid display; out-pointers reference locals.
        let status = unsafe {
            xlib::XQueryTree(
                self.display,
                window.id() as xlib::Window,
                &mut root_return,
                &mut parent_return,
                &mut children,
                &mut count,
            )
        };
        let outcome = classify("XQueryTree", window, take_trap(), status);

        let list = if children.is_null() {
            Vec::new()
        } else {
            // SAFETY: Xlib returned `count` windows at `children`; the array
            // is freed right after copying.
            unsafe {
                let list: Vec<WindowHandle> = std::slice::from_raw_parts(children, count as usize)
                    .iter()
                    .map(|&w| WindowHandle(w as u64))
                    .collect();
                xlib::XFree(children.cast());
                list
            }
        };
        outcome.map(|()| list)
    }

    fn class_hint(&self, window: WindowHandle) -> Result<Vec<String>, WindowQueryError> {
        let mut hint = xlib::XClassHint {
            res_name: ptr::null_mut(),
            res_class: ptr::null_mut(),
        };

        clear_trap();
        // SAFETY: valid display; `hint` is a local the call fills in.
        let status = unsafe { xlib::XGetClassHint(self.display, window.id() as xlib::Window, &mut hint) };
        // SAFETY: both fields are null or Xlib allocations.
        let strings: Vec<String> = unsafe { [take_xstring(hint.res_name), take_xstring(hint.res_class)] }
            .into_iter()
            .flatten()
            .collect();

        match take_trap() {
            // No WM_CLASS property: not an error, just nothing to match.
            None if status == 0 => Ok(Vec::new()),
            trapped => classify("XGetClassHint", window, trapped, status).map(|()| strings),
        }
    }

    fn map_state(&self, window: WindowHandle) -> Result<MapState, WindowQueryError> {
        // SAFETY: XWindowAttributes is plain data; all-zero is a valid value.
        let mut attrs: xlib::XWindowAttributes = unsafe { std::mem::zeroed() };

        clear_trap();
        // SAFETY: valid display; `attrs` is a local the call fills in.
        let status = unsafe { xlib::XGetWindowAttributes(self.display, window.id() as xlib::Window, &mut attrs) };
        classify("XGetWindowAttributes", window, take_trap(), status)?;

        Ok(match attrs.map_state {
            xlib::IsViewable => MapState::Viewable,
            xlib::IsUnviewable => MapState::Unviewable,
            _ => MapState::Unmapped,
        })
    }

    fn geometry(&self, window: WindowHandle) -> Result<Geometry, WindowQueryError> {
        let mut root_return: xlib::Window = 0;
        let (mut x, mut y): (c_int, c_int) = (0, 0);
        let (mut width, mut height, mut border, mut depth): (c_uint, c_uint, c_uint, c_uint) = (0, 0, 0, 0);

        clear_trap();
        // SAFETY: valid display; out-pointers reference locals.
        let status = unsafe {
            xlib::XGetGeometry(
                self.display,
                window.id() as xlib::Drawable,
                &mut root_return,
                &mut x,
                &mut y,
                &mut width,
                &mut height,
                &mut border,
                &mut depth,
            )
        };
        classify("XGetGeometry", window, take_trap(), status)?;

        Ok(Geometry { x, y, width, height })
    }

    fn pointer_position(&self, window: WindowHandle) -> Result<Anchor, WindowQueryError> {
        let (mut root_return, mut child_return): (xlib::Window, xlib::Window) = (0, 0);
        let (mut root_x, mut root_y, mut win_x, mut win_y): (c_int, c_int, c_int, c_int) = (0, 0, 0, 0);
        let mut mask: c_uint = 0;

        clear_trap();
        // SAFETY: valid display; out-pointers reference locals.
        let same_screen = unsafe {
            xlib::XQueryPointer(
                self.display,
                window.id() as xlib::Window,
                &mut root_return,
                &mut child_return,
                &mut root_x,
                &mut root_y,
                &mut win_x,
                &mut win_y,
                &mut mask,
            )
        };
        // False means the pointer is on another screen and win_x/win_y are
        // meaningless.
        classify("XQueryPointer", window, take_trap(), same_screen)?;

        Ok(Anchor::new(win_x, win_y))
    }

    fn fake_button(
        &self,
        target: WindowHandle,
        button: ScrollButton,
        pressed: bool,
        at: Anchor,
    ) -> Result<(), WindowQueryError> {
        match self.mode {
            InjectionMode::XTest => {
                // SAFETY: valid display; XTest presence was checked on connect.
                let status = unsafe {
                    xtest::XTestFakeButtonEvent(
                        self.display,
                        button.x11_button() as c_uint,
                        if pressed { xlib::True } else { xlib::False },
                        CURRENT_TIME,
                    )
                };
                classify("XTestFakeButtonEvent", target, None, status)
            }
            InjectionMode::SendEvent => {
                let status = self.send_button_event(target, button, pressed, at);
                classify("XSendEvent", target, None, status)
            }
        }
    }

    fn flush(&self) -> Result<(), WindowQueryError> {
        clear_trap();
        // SAFETY: valid display.
        unsafe {
            xlib::XSync(self.display, xlib::False);
        }
        let resource = WindowHandle(TRAPPED_RESOURCE.load(Ordering::SeqCst));
        classify("XSync", resource, take_trap(), 1)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
