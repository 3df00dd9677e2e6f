//! In-memory input devices and a scripted readiness wait for tests.
//!
//! # Handles
//!
//! A [`MockInputSource`] is moved into the code under test, so tests keep a
//! [`MockSourceHandle`] (obtained with [`MockInputSource::handle`]) to feed
//! events into it and to observe how often it was closed.  The same applies
//! to [`ScriptedReadiness`], which is `Clone` and shares its state between
//! clones.
//!
//! # Usage in tests
//!
//! ```ignore
//! let mouse = MockInputSource::new("mouse", axes);
//! let handle = mouse.handle();
//! handle.feed([RawInputEvent::relative(REL_WHEEL, 1)]);
//!
//! let fwd = ScrollForwarder::new(vec![mouse], ScriptedReadiness::new(vec![...]), ...);
//! fwd.run();
//! assert_eq!(handle.close_count(), 1);
//! ```

use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use wheel_core::{RawInputEvent, RelativeAxes};

use crate::application::platform::{
    DeviceEnumerator, DeviceError, InputSource, Readiness, ReadinessWait,
};

/// ENODEV, as returned by a read on an unplugged evdev node.
const ENODEV: i32 = 19;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ── MockInputSource ───────────────────────────────────────────────────────────

#[derive(Default)]
struct SourceState {
    pending: VecDeque<RawInputEvent>,
    /// Returned once by the next read, before any pending events.
    next_error: Option<io::ErrorKind>,
    disconnected: bool,
    reads: usize,
}

/// An input device that returns whatever was fed to it.
pub struct MockInputSource {
    name: String,
    axes: RelativeAxes,
    state: Arc<Mutex<SourceState>>,
    closes: Arc<AtomicUsize>,
}

/// Test-side view of a [`MockInputSource`] that has been moved away.
#[derive(Clone)]
pub struct MockSourceHandle {
    state: Arc<Mutex<SourceState>>,
    closes: Arc<AtomicUsize>,
}

impl MockInputSource {
    pub fn new(name: &str, axes: RelativeAxes) -> Self {
        Self {
            name: name.to_string(),
            axes,
            state: Arc::new(Mutex::new(SourceState::default())),
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn handle(&self) -> MockSourceHandle {
        MockSourceHandle {
            state: Arc::clone(&self.state),
            closes: Arc::clone(&self.closes),
        }
    }
}

impl MockSourceHandle {
    /// Queues events for the next read.
    pub fn feed(&self, events: impl IntoIterator<Item = RawInputEvent>) {
        lock(&self.state).pending.extend(events);
    }

    /// Makes the next read fail with `kind`.
    pub fn fail_next(&self, kind: io::ErrorKind) {
        lock(&self.state).next_error = Some(kind);
    }

    /// Makes every following read fail as if the device had been unplugged.
    pub fn disconnect(&self) {
        lock(&self.state).disconnected = true;
    }

    /// How many times the source has been dropped.
    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    /// How many reads were attempted.
    pub fn reads(&self) -> usize {
        lock(&self.state).reads
    }
}

impl InputSource for MockInputSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> RelativeAxes {
        self.axes
    }

    fn read_events(&mut self) -> Result<Vec<RawInputEvent>, DeviceError> {
        let mut state = lock(&self.state);
        state.reads += 1;
        if state.disconnected {
            return Err(DeviceError::from_read(
                &self.name,
                io::Error::from_raw_os_error(ENODEV),
            ));
        }
        if let Some(kind) = state.next_error.take() {
            return Err(DeviceError::from_read(&self.name, io::Error::from(kind)));
        }
        if state.pending.is_empty() {
            return Err(DeviceError::WouldBlock);
        }
        Ok(state.pending.drain(..).collect())
    }
}

impl Drop for MockInputSource {
    fn drop(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

// ── MockDeviceEnumerator ──────────────────────────────────────────────────────

enum MockNode {
    Device(Option<MockInputSource>),
    OpenError(io::ErrorKind),
}

/// A fake `/dev/input` directory.
pub struct MockDeviceEnumerator {
    nodes: Mutex<Vec<(PathBuf, MockNode)>>,
    listing_fails: bool,
}

impl MockDeviceEnumerator {
    pub fn new() -> Self {
        Self {
            nodes: Mutex::new(Vec::new()),
            listing_fails: false,
        }
    }

    /// A directory that cannot be listed at all.
    pub fn failing_listing() -> Self {
        Self {
            nodes: Mutex::new(Vec::new()),
            listing_fails: true,
        }
    }

    pub fn with_device(self, path: impl Into<PathBuf>, source: MockInputSource) -> Self {
        lock(&self.nodes).push((path.into(), MockNode::Device(Some(source))));
        self
    }

    pub fn with_permission_denied(self, path: impl Into<PathBuf>) -> Self {
        self.with_open_error(path, io::ErrorKind::PermissionDenied)
    }

    pub fn with_open_error(self, path: impl Into<PathBuf>, kind: io::ErrorKind) -> Self {
        lock(&self.nodes).push((path.into(), MockNode::OpenError(kind)));
        self
    }
}

impl Default for MockDeviceEnumerator {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceEnumerator for MockDeviceEnumerator {
    type Source = MockInputSource;

    fn device_paths(&self) -> Result<Vec<PathBuf>, DeviceError> {
        if self.listing_fails {
            return Err(DeviceError::from_open(
                Path::new("/dev/input"),
                io::Error::from(io::ErrorKind::NotFound),
            ));
        }
        Ok(lock(&self.nodes).iter().map(|(path, _)| path.clone()).collect())
    }

    fn open(&self, path: &Path) -> Result<MockInputSource, DeviceError> {
        let mut nodes = lock(&self.nodes);
        let node = nodes.iter_mut().find(|(p, _)| p == path).map(|(_, node)| node);
        match node {
            Some(MockNode::Device(slot)) => slot
                .take()
                .ok_or_else(|| DeviceError::from_open(path, io::Error::from(io::ErrorKind::Other))),
            Some(MockNode::OpenError(kind)) => Err(DeviceError::from_open(path, io::Error::from(*kind))),
            None => Err(DeviceError::from_open(path, io::Error::from(io::ErrorKind::NotFound))),
        }
    }
}

// ── ScriptedReadiness ─────────────────────────────────────────────────────────

#[derive(Default)]
struct Script {
    steps: VecDeque<io::Result<Readiness>>,
    timeouts: Vec<Duration>,
    forgotten: Vec<usize>,
}

/// A readiness wait that replays a fixed script.
///
/// Once the script runs out every wait returns [`Readiness::Interrupted`], so
/// a forwarder driven by `run()` always terminates.
#[derive(Clone, Default)]
pub struct ScriptedReadiness {
    script: Arc<Mutex<Script>>,
}

impl ScriptedReadiness {
    pub fn new(steps: Vec<Readiness>) -> Self {
        let script = Script {
            steps: steps.into_iter().map(Ok).collect(),
            ..Script::default()
        };
        Self {
            script: Arc::new(Mutex::new(script)),
        }
    }

    /// Appends a step whose wait fails with `kind`.
    pub fn push_error(&self, kind: io::ErrorKind) {
        lock(&self.script).steps.push_back(Err(io::Error::from(kind)));
    }

    /// Appends a successful step.
    pub fn push(&self, readiness: Readiness) {
        lock(&self.script).steps.push_back(Ok(readiness));
    }

    /// Timeouts passed to every `wait` so far.
    pub fn timeouts(&self) -> Vec<Duration> {
        lock(&self.script).timeouts.clone()
    }

    /// Indices passed to `forget`, in call order.
    pub fn forgotten(&self) -> Vec<usize> {
        lock(&self.script).forgotten.clone()
    }
}

impl ReadinessWait for ScriptedReadiness {
    fn wait(&mut self, timeout: Duration) -> io::Result<Readiness> {
        let mut script = lock(&self.script);
        script.timeouts.push(timeout);
        script.steps.pop_front().unwrap_or(Ok(Readiness::Interrupted))
    }

    fn forget(&mut self, index: usize) {
        lock(&self.script).forgotten.push(index);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
