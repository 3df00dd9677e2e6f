//! `poll(2)`-based readiness wait over evdev descriptors plus a wake channel.
//!
//! # Why a wake channel?
//!
//! The engine blocks inside `poll` for up to one idle timeout.  A Ctrl-C
//! handled elsewhere (the Tokio signal task) has to end that wait promptly,
//! so the poll set always contains one extra descriptor: the read end of a
//! Unix socket pair.  [`ShutdownHandle::trigger`] writes a byte into the
//! other end, which makes `poll` return and the wait report
//! [`Readiness::Interrupted`].
//!
//! ```text
//! fds: [ event3 | event5 | event9 | wake ]
//!         0        1        2       (last)
//! ```
//!
//! Only a byte actually read from the wake end counts as an interrupt.  If
//! every handle is dropped without triggering, the wake end reports a
//! hangup; it is then left out of later waits and the engine keeps running.
//!
//! A forgotten source keeps its slot but is left out of the poll set, so
//! source indices never shift.

use std::io::{self, Read, Write};
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, RawFd};
use std::os::unix::net::UnixStream;
use std::sync::Arc;
use std::time::Duration;

use nix::poll::{poll, PollFd, PollFlags, PollTimeout};

use crate::application::platform::{Readiness, ReadinessWait};

/// Creates a connected wake pair.
pub fn wake_channel() -> io::Result<(ShutdownHandle, WakeReceiver)> {
    let (tx, rx) = UnixStream::pair()?;
    rx.set_nonblocking(true)?;
    tx.set_nonblocking(true)?;
    Ok((ShutdownHandle { stream: Arc::new(tx) }, WakeReceiver { stream: rx }))
}

/// Requests the engine to stop.  Cheap to clone and `Send`.
#[derive(Clone)]
pub struct ShutdownHandle {
    stream: Arc<UnixStream>,
}

impl ShutdownHandle {
    /// Wakes the readiness wait.  Repeated calls are harmless.
    pub fn trigger(&self) -> io::Result<()> {
        match (&*self.stream).write(&[1]) {
            Ok(_) => Ok(()),
            // The buffer is full, so a wake is already pending.
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(()),
            Err(e) => Err(e),
        }
    }
}

/// The polled end of the wake pair.
pub struct WakeReceiver {
    stream: UnixStream,
}

/// What reading the wake end turned up.
enum WakeState {
    /// A byte written by [`ShutdownHandle::trigger`].
    Triggered,
    /// Every handle is gone without triggering; stop polling this end.
    Closed,
    /// Nothing to read after all.
    Idle,
}

impl WakeReceiver {
    fn take(&self) -> WakeState {
        let mut byte = [0u8; 1];
        match (&self.stream).read(&mut byte) {
            Ok(0) => WakeState::Closed,
            Ok(_) => WakeState::Triggered,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => WakeState::Idle,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => WakeState::Idle,
            Err(_) => WakeState::Closed,
        }
    }
}

impl AsRawFd for WakeReceiver {
    fn as_raw_fd(&self) -> RawFd {
        self.stream.as_raw_fd()
    }
}

impl AsFd for WakeReceiver {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.stream.as_fd()
    }
}

/// [`ReadinessWait`] backed by `nix::poll`.
pub struct PollReadiness {
    /// `None` once forgotten, so source indices never shift.
    sources: Vec<Option<RawFd>>,
    wake: WakeReceiver,
    wake_open: bool,
}

impl PollReadiness {
    /// `sources[i]` becomes index `i`.  The descriptors must outlive this
    /// value; the forwarder guarantees that by owning both.
    pub fn new(sources: &[RawFd], wake: WakeReceiver) -> Self {
        Self {
            sources: sources.iter().map(|&fd| Some(fd)).collect(),
            wake,
            wake_open: true,
        }
    }
}

/// Timeout for `poll`, clamped to the largest value it accepts.
fn poll_timeout(timeout: Duration) -> PollTimeout {
    PollTimeout::try_from(timeout).unwrap_or(PollTimeout::MAX)
}

impl ReadinessWait for PollReadiness {
    fn wait(&mut self, timeout: Duration) -> io::Result<Readiness> {
        let polled: Vec<(usize, RawFd)> = self
            .sources
            .iter()
            .enumerate()
            .filter_map(|(index, fd)| fd.map(|fd| (index, fd)))
            .collect();

        let (source_events, wake_events) = {
            let mut fds: Vec<PollFd<'_>> = polled
                .iter()
                .map(|&(_, fd)| {
                    // SAFETY: forgotten slots are skipped, and every other
                    // descriptor stays open while its source is owned by
                    // the forwarder that also owns this value.
                    let fd = unsafe { BorrowedFd::borrow_raw(fd) };
                    PollFd::new(fd, PollFlags::POLLIN)
                })
                .collect();
            if self.wake_open {
                fds.push(PollFd::new(self.wake.as_fd(), PollFlags::POLLIN));
            }

            if poll(&mut fds, poll_timeout(timeout))? == 0 {
                return Ok(Readiness::TimedOut);
            }

            let mut events: Vec<PollFlags> = fds
                .iter()
                .map(|fd| fd.revents().unwrap_or(PollFlags::empty()))
                .collect();
            let wake_events = if self.wake_open { events.pop() } else { None };
            (events, wake_events)
        };

        if let Some(flags) = wake_events {
            if flags.intersects(PollFlags::POLLIN | PollFlags::POLLHUP | PollFlags::POLLERR) {
                match self.wake.take() {
                    WakeState::Triggered => return Ok(Readiness::Interrupted),
                    WakeState::Closed => self.wake_open = false,
                    WakeState::Idle => {}
                }
            }
        }

        let ready_mask = PollFlags::POLLIN | PollFlags::POLLHUP | PollFlags::POLLERR;
        let ready: Vec<usize> = polled
            .iter()
            .zip(&source_events)
            .filter(|(_, flags)| flags.intersects(ready_mask))
            .map(|(&(index, _), _)| index)
            .collect();

        if ready.is_empty() {
            // Only the wake end hung up, or a slot reported POLLNVAL.
            return Ok(Readiness::TimedOut);
        }
        Ok(Readiness::Ready(ready))
    }

    fn forget(&mut self, index: usize) {
        if let Some(slot) = self.sources.get_mut(index) {
            *slot = None;
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
