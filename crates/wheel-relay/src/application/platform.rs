//! Platform-agnostic traits the application layer is written against.
//!
//! Two external systems are involved:
//!
//! - the **input subsystem** (Linux evdev), reached through
//!   [`DeviceEnumerator`], [`InputSource`], and [`ReadinessWait`];
//! - the **display server** (X11), reached through [`WindowSystem`].
//!
//! Real implementations live in `infrastructure::input_devices` and
//! `infrastructure::window_system`; in-memory mocks live next to them so the
//! whole engine can be tested without a device node or an X server.
//!
//! # Error classification
//!
//! Every call returns a classified error instead of a bare failure flag, so
//! callers can tell "the window is gone" apart from "the server said no for
//! some other reason", even when both end up with the same safe default.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use wheel_core::{Anchor, RawInputEvent, RelativeAxes, ScrollButton, WindowHandle};

// ── Display server ────────────────────────────────────────────────────────────

/// Errors from a single display-server request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WindowQueryError {
    /// The server reported that the window does not exist (`BadWindow`).
    #[error("window {0} does not exist")]
    NoSuchWindow(WindowHandle),

    /// The server rejected the request with some other error code.
    #[error("{request} on window {window} failed with X error code {code}")]
    Protocol {
        request: &'static str,
        window: WindowHandle,
        code: u8,
    },

    /// The request returned no data without the server reporting an error
    /// (e.g. the pointer is on another screen, or the extension is missing).
    #[error("{request} on window {window} returned no result")]
    Unavailable {
        request: &'static str,
        window: WindowHandle,
    },
}

impl WindowQueryError {
    /// Returns `true` only for a definitive "window does not exist" answer.
    pub fn is_no_such_window(&self) -> bool {
        matches!(self, Self::NoSuchWindow(_))
    }
}

/// A window's presentation state (`map_state` in X11 terms).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapState {
    /// Not mapped (withdrawn or never shown).
    Unmapped,
    /// Mapped, but an ancestor is unmapped so nothing is on screen.
    Unviewable,
    /// Mapped and all ancestors mapped.
    Viewable,
}

/// Position and size of a window relative to its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// The display-server requests the engine needs.
///
/// Implementations only *query* windows and *send input* to them.  None of
/// these methods may create, reparent, or destroy a window.
pub trait WindowSystem {
    /// The root window of the default screen.
    fn root_window(&self) -> WindowHandle;

    /// Lists the direct children of `window`, bottom-most first.
    fn query_children(&self, window: WindowHandle) -> Result<Vec<WindowHandle>, WindowQueryError>;

    /// Fetches the class hint strings (instance name, class name).
    ///
    /// A window without a class hint yields an empty list, not an error.
    fn class_hint(&self, window: WindowHandle) -> Result<Vec<String>, WindowQueryError>;

    /// Fetches the window's map state.
    fn map_state(&self, window: WindowHandle) -> Result<MapState, WindowQueryError>;

    /// Fetches the window's geometry.  Used as the cheapest existence probe.
    fn geometry(&self, window: WindowHandle) -> Result<Geometry, WindowQueryError>;

    /// Reads the pointer position relative to `window`'s origin.
    fn pointer_position(&self, window: WindowHandle) -> Result<Anchor, WindowQueryError>;

    /// Synthesizes one press or release of a scroll button aimed at `target`.
    fn fake_button(
        &self,
        target: WindowHandle,
        button: ScrollButton,
        pressed: bool,
        at: Anchor,
    ) -> Result<(), WindowQueryError>;

    /// Pushes all buffered requests to the server and waits until they are
    /// processed.
    fn flush(&self) -> Result<(), WindowQueryError>;
}

impl<T: WindowSystem + ?Sized> WindowSystem for &T {
    fn root_window(&self) -> WindowHandle {
        (**self).root_window()
    }

    fn query_children(&self, window: WindowHandle) -> Result<Vec<WindowHandle>, WindowQueryError> {
        (**self).query_children(window)
    }

    fn class_hint(&self, window: WindowHandle) -> Result<Vec<String>, WindowQueryError> {
        (**self).class_hint(window)
    }

    fn map_state(&self, window: WindowHandle) -> Result<MapState, WindowQueryError> {
        (**self).map_state(window)
    }

    fn geometry(&self, window: WindowHandle) -> Result<Geometry, WindowQueryError> {
        (**self).geometry(window)
    }

    fn pointer_position(&self, window: WindowHandle) -> Result<Anchor, WindowQueryError> {
        (**self).pointer_position(window)
    }

    fn fake_button(
        &self,
        target: WindowHandle,
        button: ScrollButton,
        pressed: bool,
        at: Anchor,
    ) -> Result<(), WindowQueryError> {
        (**self).fake_button(target, button, pressed, at)
    }

    fn flush(&self) -> Result<(), WindowQueryError> {
        (**self).flush()
    }
}

// ── Input subsystem ───────────────────────────────────────────────────────────

/// Errors from opening or reading an input device.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// The process may not open the device node.
    #[error("permission denied opening {}", .0.display())]
    PermissionDenied(PathBuf),

    /// No events are pending on a non-blocking read.
    #[error("no events pending")]
    WouldBlock,

    /// The device node went away (unplugged).
    #[error("device '{0}' has been removed")]
    Disconnected(String),

    /// Any other I/O failure.
    #[error("I/O error on '{device}': {source}")]
    Io {
        device: String,
        #[source]
        source: io::Error,
    },
}

impl DeviceError {
    /// Classifies an I/O error raised while reading from `device`.
    pub fn from_read(device: &str, err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::WouldBlock {
            return Self::WouldBlock;
        }
        // ENODEV: the kernel removed the device under an open descriptor.
        if err.raw_os_error() == Some(19) {
            return Self::Disconnected(device.to_string());
        }
        Self::Io { device: device.to_string(), source: err }
    }

    /// Classifies an I/O error raised while opening `path`.
    pub fn from_open(path: &Path, err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::PermissionDenied {
            return Self::PermissionDenied(path.to_path_buf());
        }
        Self::Io { device: path.display().to_string(), source: err }
    }
}

/// An opened input device.
///
/// Dropping the source closes the underlying descriptor, so ownership alone
/// guarantees it is released exactly once.
pub trait InputSource {
    /// Human-readable device name, e.g. `"Logitech G102"`.
    fn name(&self) -> &str;

    /// Relative axes the device advertises.
    fn capabilities(&self) -> RelativeAxes;

    /// Reads every event currently pending without blocking.
    ///
    /// Returns [`DeviceError::WouldBlock`] when nothing is pending.
    fn read_events(&mut self) -> Result<Vec<RawInputEvent>, DeviceError>;
}

/// Lists and opens device nodes.
pub trait DeviceEnumerator {
    type Source: InputSource;

    /// All candidate device node paths, in a stable order.
    fn device_paths(&self) -> Result<Vec<PathBuf>, DeviceError>;

    /// Opens one device read-only and non-blocking.
    fn open(&self, path: &Path) -> Result<Self::Source, DeviceError>;
}

/// Outcome of one bounded readiness wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    /// These source indices have events (or errors) to read, in the order the
    /// wait reported them.
    Ready(Vec<usize>),
    /// The timeout elapsed with nothing to read.
    TimedOut,
    /// An external stop was requested.
    Interrupted,
}

/// Multiplexed wait over all open sources.
///
/// Source indices are positions in the `Vec` the orchestrator was built with.
pub trait ReadinessWait {
    /// Blocks until a source is readable, `timeout` elapses, or a stop is
    /// requested.
    fn wait(&mut self, timeout: Duration) -> io::Result<Readiness>;

    /// Stops watching source `index` (it has been closed).
    fn forget(&mut self, index: usize);
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_would_block_read_is_classified_as_would_block() {
        let err = io::Error::from(io::ErrorKind::WouldBlock);
        assert!(matches!(DeviceError::from_read("mouse", err), DeviceError::WouldBlock));
    }

    #[test]
    fn test_enodev_read_is_classified_as_disconnected() {
        let err = io::Error::from_raw_os_error(19);
        match DeviceError::from_read("mouse", err) {
            DeviceError::Disconnected(name) => assert_eq!(name, "mouse"),
            other => panic!("expected Disconnected, got {other:?}"),
        }
    }

    #[test]
    fn test_other_read_error_is_classified_as_io() {
        let err = io::Error::from(io::ErrorKind::InvalidData);
        assert!(matches!(DeviceError::from_read("mouse", err), DeviceError::Io { .. }));
    }

    #[test]
    fn test_permission_denied_open_keeps_path() {
        let err = io::Error::from(io::ErrorKind::PermissionDenied);
        let path = Path::new("/dev/input/event3");
        match DeviceError::from_open(path, err) {
            DeviceError::PermissionDenied(p) => assert_eq!(p, path),
            other => panic!("expected PermissionDenied, got {other:?}"),
        }
    }

    #[test]
    fn test_only_bad_window_counts_as_no_such_window() {
        let window = WindowHandle(5);
        assert!(WindowQueryError::NoSuchWindow(window).is_no_such_window());
        assert!(!WindowQueryError::Protocol { request: "GetGeometry", window, code: 10 }
            .is_no_such_window());
        assert!(!WindowQueryError::Unavailable { request: "GetGeometry", window }
            .is_no_such_window());
    }
}
