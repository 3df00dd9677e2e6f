//! Linux evdev input devices.
//!
//! # What is evdev? (for beginners)
//!
//! Every input device the kernel knows about is exposed as a character device
//! under `/dev/input/eventN`.  Reading from it yields fixed-size
//! `struct input_event` records `{time, type, code, value}`.  A mouse wheel
//! notch, for instance, arrives as `type = EV_REL (2)`, `code = REL_WHEEL (8)`,
//! `value = +1` or `-1`, followed by an `EV_SYN` record closing the frame.
//!
//! The `evdev` crate wraps the `ioctl`s for capability introspection and the
//! buffered read loop; this module only adds:
//!
//! - enumeration in numeric order (`event2` before `event10`);
//! - switching each descriptor to `O_NONBLOCK` so one quiet device never
//!   stalls the loop;
//! - translating `evdev::InputEvent` into the OS-free [`RawInputEvent`].
//!
//! # Permissions
//!
//! The nodes are normally `root:input 0660`.  Opening them as an ordinary
//! user fails with `EACCES`, which [`DeviceError::from_open`] classifies as
//! `PermissionDenied` so the scanner can skip the node.

use std::fs;
use std::io;
use std::os::fd::{AsRawFd, RawFd};
use std::path::{Path, PathBuf};

use evdev::Device;
use tracing::trace;
use wheel_core::{RawInputEvent, RelativeAxes};

use crate::application::platform::{DeviceEnumerator, DeviceError, InputSource};

/// Where the kernel publishes event device nodes.
pub const INPUT_DIR: &str = "/dev/input";

/// Lists `/dev/input/event*` and opens nodes with the `evdev` crate.
pub struct EvdevEnumerator {
    dir: PathBuf,
}

impl EvdevEnumerator {
    pub fn new() -> Self {
        Self::with_dir(INPUT_DIR)
    }

    /// Enumerates a different directory (e.g. a udev test tree).
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl Default for EvdevEnumerator {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceEnumerator for EvdevEnumerator {
    type Source = EvdevSource;

    fn device_paths(&self) -> Result<Vec<PathBuf>, DeviceError> {
        let entries = fs::read_dir(&self.dir).map_err(|e| DeviceError::from_open(&self.dir, e))?;

        let mut nodes: Vec<(u32, PathBuf)> = entries
            .filter_map(Result::ok)
            .filter_map(|entry| {
                let path = entry.path();
                let index = event_node_index(&path)?;
                Some((index, path))
            })
            .collect();
        nodes.sort_by_key(|(index, _)| *index);

        Ok(nodes.into_iter().map(|(_, path)| path).collect())
    }

    fn open(&self, path: &Path) -> Result<EvdevSource, DeviceError> {
        let device = Device::open(path).map_err(|e| DeviceError::from_open(path, e))?;
        set_nonblocking(device.as_raw_fd()).map_err(|e| DeviceError::from_open(path, e))?;

        let name = device.name().unwrap_or("unknown").to_string();
        let axes: RelativeAxes = device
            .supported_relative_axes()
            .map(|set| set.iter().map(|axis| axis.0).collect())
            .unwrap_or_default();
        trace!(path = %path.display(), %name, "opened input device");

        Ok(EvdevSource {
            path: path.to_path_buf(),
            name,
            axes,
            device,
        })
    }
}

/// `/dev/input/event7` → `Some(7)`; anything else → `None`.
fn event_node_index(path: &Path) -> Option<u32> {
    path.file_name()?
        .to_str()?
        .strip_prefix("event")?
        .parse()
        .ok()
}

/// ORs `O_NONBLOCK` into the descriptor's status flags.
fn set_nonblocking(fd: RawFd) -> io::Result<()> {
    // SAFETY: `fd` belongs to a `Device` that is alive for the whole call;
    // F_GETFL/F_SETFL only touch the open file description's flags.
    let current = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if current < 0 {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: as above.
    let rc = unsafe { libc::fcntl(fd, libc::F_SETFL, current | libc::O_NONBLOCK) };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// An opened evdev node.  Dropping it closes the descriptor.
pub struct EvdevSource {
    path: PathBuf,
    name: String,
    axes: RelativeAxes,
    device: Device,
}

impl EvdevSource {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AsRawFd for EvdevSource {
    fn as_raw_fd(&self) -> RawFd {
        self.device.as_raw_fd()
    }
}

impl InputSource for EvdevSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> RelativeAxes {
        self.axes
    }

    fn read_events(&mut self) -> Result<Vec<RawInputEvent>, DeviceError> {
        let events = self
            .device
            .fetch_events()
            .map_err(|e| DeviceError::from_read(&self.name, e))?;
        let batch: Vec<RawInputEvent> = events
            .map(|ev| RawInputEvent {
                event_type: ev.event_type().0,
                code: ev.code(),
                value: ev.value(),
            })
            .collect();
        if batch.is_empty() {
            return Err(DeviceError::WouldBlock);
        }
        Ok(batch)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_node_index_parses_event_nodes() {
        assert_eq!(event_node_index(Path::new("/dev/input/event0")), Some(0));
        assert_eq!(event_node_index(Path::new("/dev/input/event12")), Some(12));
    }

    #[test]
    fn test_event_node_index_rejects_other_nodes() {
        assert_eq!(event_node_index(Path::new("/dev/input/mice")), None);
        assert_eq!(event_node_index(Path::new("/dev/input/mouse0")), None);
        assert_eq!(event_node_index(Path::new("/dev/input/by-id")), None);
        assert_eq!(event_node_index(Path::new("/dev/input/eventX")), None);
    }

    #[test]
    fn test_missing_directory_is_an_enumeration_error() {
        let enumerator = EvdevEnumerator::with_dir("/nonexistent/wheel-relay-input");
        assert!(enumerator.device_paths().is_err());
    }

    #[test]
    fn test_set_nonblocking_on_invalid_fd_fails() {
        assert!(set_nonblocking(-1).is_err());
    }
}
