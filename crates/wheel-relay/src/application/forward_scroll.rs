//! ScrollForwarder: the event loop that ties every other use case together.
//!
//! # One iteration
//!
//! ```text
//! wait (≤ idle timeout) ──► Interrupted ──► Stopped
//!        │
//!        ├─ WaitingForWindow: WindowLocator::resolve  ──► Tracking
//!        ├─ Tracking:         ExistenceTracker::exists ──false──► Lost ──► Stopped
//!        │
//!        └─ for each ready source:
//!             read_events ─► ScrollEvent::from_raw ─► Tracking && is_active?
//!                                                        └─► ScrollInjector::inject
//! ```
//!
//! The wait is the only place the loop blocks.  Because it is bounded by the
//! idle timeout, a window that appears while no input arrives is still picked
//! up within one timeout.
//!
//! # Notices
//!
//! The forwarder never logs.  Everything worth reporting is sent as a
//! [`RelayEvent`] over an unbounded channel; the binary drains the channel
//! and decides the log level.  A closed receiver is not an error.
//!
//! # Resource release
//!
//! Sources are owned by the forwarder.  They are dropped (closed) exactly
//! once: when the loop stops, when a device is unplugged, or when the
//! forwarder itself is dropped.

use std::io;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use wheel_core::{
    Anchor, ScrollAxis, ScrollEvent, TargetEndpoint, TargetQuery, WindowHandle,
};

use super::inject_scroll::ScrollInjector;
use super::locate_window::WindowLocator;
use super::platform::{DeviceError, InputSource, Readiness, ReadinessWait, WindowSystem};
use super::track_window::{ExistenceTracker, VisibilityTracker};

/// Default bound on one readiness wait.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_millis(500);

/// Tunables of the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelaySettings {
    /// Upper bound on one readiness wait, and therefore on how late a newly
    /// mapped target is noticed.
    pub idle_timeout: Duration,
    /// Click position used when the pointer cannot be read.
    pub fallback_anchor: Anchor,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            fallback_anchor: Anchor::FALLBACK,
        }
    }
}

/// Loop state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwarderState {
    /// No target yet; the locator is retried once per iteration.
    WaitingForWindow,
    /// A target is held and events may be forwarded to it.
    Tracking,
    /// Terminal.
    Stopped,
}

/// Why the loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The target window was destroyed.
    TargetLost(WindowHandle),
    /// An external stop was requested.
    Interrupted,
    /// The readiness wait itself failed; nothing more can be read.
    ReadinessFailed(String),
}

/// Notices emitted by the loop for the caller to log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayEvent {
    /// The initial search found nothing; sent once.
    WaitingForWindow { query: TargetQuery },
    WindowFound { window: WindowHandle },
    WindowLost { window: WindowHandle },
    /// One scroll event was injected.
    Forwarded {
        window: WindowHandle,
        axis: ScrollAxis,
        delta: i32,
    },
    InjectionFailed { window: WindowHandle, error: String },
    DeviceReadFailed { device: String, error: String },
    /// The device node vanished; the source has been closed.
    DeviceRemoved { device: String },
    Stopped { reason: StopReason },
}

/// Returned by [`ScrollForwarder::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub reason: StopReason,
    /// Number of scroll events injected over the whole run.
    pub forwarded: u64,
}

/// Forwards scroll input from a set of devices into one window.
pub struct ScrollForwarder<S, R, W> {
    /// Indexed like the readiness set.  `None` marks a closed source.
    sources: Vec<Option<S>>,
    readiness: R,
    windows: W,
    target: TargetEndpoint,
    state: ForwarderState,
    settings: RelaySettings,
    notices: UnboundedSender<RelayEvent>,
    forwarded: u64,
    stop_reason: Option<StopReason>,
}

impl<S, R, W> ScrollForwarder<S, R, W>
where
    S: InputSource,
    R: ReadinessWait,
    W: WindowSystem,
{
    /// Builds the forwarder and performs the initial target search.
    ///
    /// `sources[i]` must correspond to index `i` of `readiness`.
    pub fn new(
        sources: Vec<S>,
        readiness: R,
        windows: W,
        query: TargetQuery,
        settings: RelaySettings,
        notices: UnboundedSender<RelayEvent>,
    ) -> Self {
        let mut forwarder = Self {
            sources: sources.into_iter().map(Some).collect(),
            readiness,
            windows,
            target: TargetEndpoint::new(query),
            state: ForwarderState::WaitingForWindow,
            settings,
            notices,
            forwarded: 0,
            stop_reason: None,
        };

        if let Some(window) = forwarder.target.handle() {
            forwarder.state = ForwarderState::Tracking;
            forwarder.notify(RelayEvent::WindowFound { window });
        } else if !forwarder.try_resolve() {
            let query = forwarder.target.query().clone();
            forwarder.notify(RelayEvent::WaitingForWindow { query });
        }
        forwarder
    }

    pub fn state(&self) -> ForwarderState {
        self.state
    }

    pub fn target(&self) -> &TargetEndpoint {
        &self.target
    }

    /// Scroll events injected so far.
    pub fn forwarded(&self) -> u64 {
        self.forwarded
    }

    /// Sources that are still open.
    pub fn open_sources(&self) -> usize {
        self.sources.iter().filter(|s| s.is_some()).count()
    }

    /// Runs until the target is lost, a stop is requested, or the wait fails.
    ///
    /// Every source is closed before this returns.
    pub fn run(mut self) -> RunSummary {
        let reason = loop {
            if let Some(reason) = self.step() {
                break reason;
            }
        };
        RunSummary {
            reason,
            forwarded: self.forwarded,
        }
    }

    /// Executes one iteration.  Returns the stop reason once the loop is over;
    /// calling it again after that returns the same reason without doing
    /// anything.
    pub fn step(&mut self) -> Option<StopReason> {
        if let Some(reason) = &self.stop_reason {
            return Some(reason.clone());
        }

        let ready = match self.readiness.wait(self.settings.idle_timeout) {
            Ok(Readiness::Ready(indices)) => indices,
            Ok(Readiness::TimedOut) => Vec::new(),
            Ok(Readiness::Interrupted) => return Some(self.stop(StopReason::Interrupted)),
            // A signal landed mid-wait without going through the wake channel.
            Err(e) if e.kind() == io::ErrorKind::Interrupted => Vec::new(),
            Err(e) => return Some(self.stop(StopReason::ReadinessFailed(e.to_string()))),
        };

        if self.state == ForwarderState::WaitingForWindow {
            self.try_resolve();
        }

        if self.state == ForwarderState::Tracking {
            if let Some(reason) = self.check_existence() {
                return Some(reason);
            }
        }

        for index in ready {
            self.drain_source(index);
        }
        None
    }

    // ── Internals ─────────────────────────────────────────────────────────────

    /// Searches for the target; on success switches to `Tracking`.
    fn try_resolve(&mut self) -> bool {
        let found = match self.target.query() {
            TargetQuery::ClassName(class) => WindowLocator::new(&self.windows).resolve(class),
            TargetQuery::WindowId(window) => Some(*window),
        };
        let Some(window) = found else {
            return false;
        };
        if self.target.resolve(window).is_err() {
            return false;
        }
        self.state = ForwarderState::Tracking;
        self.notify(RelayEvent::WindowFound { window });
        true
    }

    fn check_existence(&mut self) -> Option<StopReason> {
        let window = self.target.handle()?;
        if ExistenceTracker::new(&self.windows).exists(window) {
            return None;
        }
        let lost = self.target.mark_lost().unwrap_or(window);
        self.notify(RelayEvent::WindowLost { window: lost });
        Some(self.stop(StopReason::TargetLost(lost)))
    }

    fn drain_source(&mut self, index: usize) {
        let result = match self.sources.get_mut(index) {
            Some(Some(source)) => source
                .read_events()
                .map_err(|e| (source.name().to_string(), e)),
            _ => return,
        };

        let events = match result {
            Ok(events) => events,
            Err((_, DeviceError::WouldBlock)) => return,
            Err((device, DeviceError::Disconnected(_))) => {
                self.sources[index] = None;
                self.readiness.forget(index);
                self.notify(RelayEvent::DeviceRemoved { device });
                return;
            }
            Err((device, e)) => {
                self.notify(RelayEvent::DeviceReadFailed {
                    device,
                    error: e.to_string(),
                });
                return;
            }
        };

        for raw in &events {
            if let Some(scroll) = ScrollEvent::from_raw(raw) {
                self.forward(scroll);
            }
        }
    }

    fn forward(&mut self, scroll: ScrollEvent) {
        if self.state != ForwarderState::Tracking {
            return;
        }
        let Some(window) = self.target.handle() else {
            return;
        };
        if !VisibilityTracker::new(&self.windows).is_active(window) {
            return;
        }

        let injector = ScrollInjector::new(&self.windows, self.settings.fallback_anchor);
        match injector.inject(scroll.axis, scroll.delta, Some(window)) {
            Ok(Some(_)) => {
                self.forwarded += 1;
                self.notify(RelayEvent::Forwarded {
                    window,
                    axis: scroll.axis,
                    delta: scroll.delta,
                });
            }
            Ok(None) => {}
            Err(e) => self.notify(RelayEvent::InjectionFailed {
                window,
                error: e.to_string(),
            }),
        }
    }

    fn stop(&mut self, reason: StopReason) -> StopReason {
        self.state = ForwarderState::Stopped;
        self.sources.clear();
        self.stop_reason = Some(reason.clone());
        self.notify(RelayEvent::Stopped {
            reason: reason.clone(),
        });
        reason
    }

    fn notify(&self, event: RelayEvent) {
        // Nobody listening is fine.
        let _ = self.notices.send(event);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::platform::{Geometry, MapState, WindowQueryError};
    use crate::infrastructure::input_devices::mock::{MockInputSource, ScriptedReadiness};
    use crate::infrastructure::window_system::mock::MockWindowSystem;
    use mockall::mock;
    use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
    use wheel_core::domain::scroll::{REL_HWHEEL, REL_WHEEL, REL_WHEEL_HI_RES};
    use wheel_core::{RawInputEvent, RelativeAxes, ResolutionState, ScrollButton};

    const TARGET: WindowHandle = WindowHandle(0x4400007);
    const CLASS: &str = "Alacritty";

    fn wheel_mouse() -> MockInputSource {
        MockInputSource::new("mouse", [REL_WHEEL, REL_HWHEEL].into_iter().collect::<RelativeAxes>())
    }

    fn desktop_with_target() -> MockWindowSystem {
        let ws = MockWindowSystem::new();
        ws.add_window(ws.root_window(), TARGET, &["Alacritty", "Alacritty"]);
        ws
    }

    fn drain(rx: &mut UnboundedReceiver<RelayEvent>) -> Vec<RelayEvent> {
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            out.push(event);
        }
        out
    }

    fn buttons(ws: &MockWindowSystem) -> Vec<(ScrollButton, bool)> {
        ws.button_calls().iter().map(|c| (c.button, c.pressed)).collect()
    }

    fn class_query() -> TargetQuery {
        TargetQuery::ClassName(CLASS.to_string())
    }

    // ── Startup ───────────────────────────────────────────────────────────────

    #[test]
    fn test_new_starts_tracking_when_target_exists() {
        let ws = desktop_with_target();
        let (tx, mut rx) = unbounded_channel();

        let fwd = ScrollForwarder::new(
            vec![wheel_mouse()],
            ScriptedReadiness::new(vec![]),
            &ws,
            class_query(),
            RelaySettings::default(),
            tx,
        );

        assert_eq!(fwd.state(), ForwarderState::Tracking);
        assert_eq!(fwd.target().handle(), Some(TARGET));
        assert_eq!(drain(&mut rx), vec![RelayEvent::WindowFound { window: TARGET }]);
    }

    #[test]
    fn test_new_waits_and_notifies_once_when_target_missing() {
        let ws = MockWindowSystem::new();
        let (tx, mut rx) = unbounded_channel();

        let mut fwd = ScrollForwarder::new(
            vec![wheel_mouse()],
            ScriptedReadiness::new(vec![Readiness::TimedOut, Readiness::TimedOut]),
            &ws,
            class_query(),
            RelaySettings::default(),
            tx,
        );
        fwd.step();
        fwd.step();

        assert_eq!(fwd.state(), ForwarderState::WaitingForWindow);
        assert_eq!(
            drain(&mut rx),
            vec![RelayEvent::WaitingForWindow { query: class_query() }]
        );
    }

    #[test]
    fn test_explicit_window_id_starts_tracking_without_search() {
        let ws = desktop_with_target();
        let (tx, _rx) = unbounded_channel();

        let fwd = ScrollForwarder::new(
            vec![wheel_mouse()],
            ScriptedReadiness::new(vec![]),
            &ws,
            TargetQuery::WindowId(TARGET),
            RelaySettings::default(),
            tx,
        );

        assert_eq!(fwd.state(), ForwarderState::Tracking);
        assert_eq!(ws.class_hint_calls(), 0);
    }

    // ── Resolution while waiting ──────────────────────────────────────────────

    #[test]
    fn test_target_appearing_is_tracked_after_one_idle_timeout_without_input() {
        // Arrange
        let ws = MockWindowSystem::new();
        let readiness = ScriptedReadiness::new(vec![Readiness::TimedOut]);
        let probe = readiness.clone();
        let settings = RelaySettings {
            idle_timeout: Duration::from_millis(250),
            ..RelaySettings::default()
        };
        let (tx, mut rx) = unbounded_channel();
        let mut fwd = ScrollForwarder::new(vec![wheel_mouse()], readiness, &ws, class_query(), settings, tx);
        drain(&mut rx);

        // Act: the window shows up, then one idle wait elapses.
        ws.add_window(ws.root_window(), TARGET, &["Alacritty", "Alacritty"]);
        let stop = fwd.step();

        // Assert
        assert_eq!(stop, None);
        assert_eq!(fwd.state(), ForwarderState::Tracking);
        assert_eq!(fwd.target().state(), ResolutionState::Resolved);
        assert_eq!(probe.timeouts(), vec![Duration::from_millis(250)]);
        assert_eq!(drain(&mut rx), vec![RelayEvent::WindowFound { window: TARGET }]);
    }

    #[test]
    fn test_events_while_waiting_are_discarded() {
        let ws = MockWindowSystem::new();
        let mouse = wheel_mouse();
        mouse.handle().feed([RawInputEvent::relative(REL_WHEEL, 2)]);
        let (tx, _rx) = unbounded_channel();
        let mut fwd = ScrollForwarder::new(
            vec![mouse],
            ScriptedReadiness::new(vec![Readiness::Ready(vec![0])]),
            &ws,
            class_query(),
            RelaySettings::default(),
            tx,
        );

        fwd.step();

        assert!(ws.button_calls().is_empty());
        assert_eq!(fwd.forwarded(), 0);
    }

    // ── Forwarding ────────────────────────────────────────────────────────────

    #[test]
    fn test_scenario_v1_h2_vminus1_is_forwarded_in_order() {
        // Arrange
        let ws = desktop_with_target();
        let mouse = wheel_mouse();
        mouse.handle().feed([
            RawInputEvent::relative(REL_WHEEL, 1),
            RawInputEvent::relative(REL_HWHEEL, 2),
            RawInputEvent::relative(REL_WHEEL, -1),
        ]);
        let (tx, _rx) = unbounded_channel();
        let mut fwd = ScrollForwarder::new(
            vec![mouse],
            ScriptedReadiness::new(vec![Readiness::Ready(vec![0])]),
            &ws,
            class_query(),
            RelaySettings::default(),
            tx,
        );

        // Act
        fwd.step();

        // Assert
        assert_eq!(
            buttons(&ws),
            vec![
                (ScrollButton::Up, true),
                (ScrollButton::Up, false),
                (ScrollButton::Right, true),
                (ScrollButton::Right, false),
                (ScrollButton::Right, true),
                (ScrollButton::Right, false),
                (ScrollButton::Down, true),
                (ScrollButton::Down, false),
            ]
        );
        assert_eq!(ws.flush_count(), 3);
        assert_eq!(fwd.forwarded(), 3);
    }

    #[test]
    fn test_non_scroll_events_are_ignored() {
        let ws = desktop_with_target();
        let mouse = wheel_mouse();
        mouse.handle().feed([
            RawInputEvent::relative(0x00, 15),
            RawInputEvent::relative(REL_WHEEL_HI_RES, 120),
            RawInputEvent::relative(REL_WHEEL, 0),
            RawInputEvent { event_type: 0x00, code: 0, value: 0 },
        ]);
        let (tx, _rx) = unbounded_channel();
        let mut fwd = ScrollForwarder::new(
            vec![mouse],
            ScriptedReadiness::new(vec![Readiness::Ready(vec![0])]),
            &ws,
            class_query(),
            RelaySettings::default(),
            tx,
        );

        fwd.step();

        assert!(ws.button_calls().is_empty());
        assert_eq!(ws.flush_count(), 0);
    }

    #[test]
    fn test_inactive_target_receives_no_injection() {
        let ws = desktop_with_target();
        ws.set_map_state(TARGET, MapState::Unmapped);
        let mouse = wheel_mouse();
        mouse.handle().feed([RawInputEvent::relative(REL_WHEEL, 3)]);
        let (tx, _rx) = unbounded_channel();
        let mut fwd = ScrollForwarder::new(
            vec![mouse],
            ScriptedReadiness::new(vec![Readiness::Ready(vec![0])]),
            &ws,
            class_query(),
            RelaySettings::default(),
            tx,
        );

        let stop = fwd.step();

        assert_eq!(stop, None);
        assert!(ws.button_calls().is_empty());
        assert_eq!(fwd.state(), ForwarderState::Tracking);
    }

    #[test]
    fn test_events_from_several_sources_are_all_forwarded() {
        let ws = desktop_with_target();
        let mouse = wheel_mouse();
        let trackball = wheel_mouse();
        mouse.handle().feed([RawInputEvent::relative(REL_WHEEL, 1)]);
        trackball.handle().feed([RawInputEvent::relative(REL_WHEEL, -1)]);
        let (tx, _rx) = unbounded_channel();
        let mut fwd = ScrollForwarder::new(
            vec![mouse, trackball],
            ScriptedReadiness::new(vec![Readiness::Ready(vec![1, 0])]),
            &ws,
            class_query(),
            RelaySettings::default(),
            tx,
        );

        fwd.step();

        let order: Vec<ScrollButton> = ws.button_calls().iter().map(|c| c.button).collect();
        assert_eq!(
            order,
            vec![ScrollButton::Down, ScrollButton::Down, ScrollButton::Up, ScrollButton::Up]
        );
    }

    #[test]
    fn test_injection_failure_is_reported_and_loop_continues() {
        let ws = desktop_with_target();
        ws.fail_buttons(WindowQueryError::Unavailable { request: "XTestFakeButtonEvent", window: TARGET });
        let mouse = wheel_mouse();
        mouse.handle().feed([RawInputEvent::relative(REL_WHEEL, 1)]);
        let (tx, mut rx) = unbounded_channel();
        let mut fwd = ScrollForwarder::new(
            vec![mouse],
            ScriptedReadiness::new(vec![Readiness::Ready(vec![0])]),
            &ws,
            class_query(),
            RelaySettings::default(),
            tx,
        );
        drain(&mut rx);

        let stop = fwd.step();

        assert_eq!(stop, None);
        assert_eq!(fwd.forwarded(), 0);
        assert!(matches!(
            drain(&mut rx).as_slice(),
            [RelayEvent::InjectionFailed { window: TARGET, .. }]
        ));
    }

    // ── Device errors ─────────────────────────────────────────────────────────

    #[test]
    fn test_would_block_source_is_skipped_silently() {
        let ws = desktop_with_target();
        let (tx, mut rx) = unbounded_channel();
        let mut fwd = ScrollForwarder::new(
            vec![wheel_mouse()],
            ScriptedReadiness::new(vec![Readiness::Ready(vec![0])]),
            &ws,
            class_query(),
            RelaySettings::default(),
            tx,
        );
        drain(&mut rx);

        assert_eq!(fwd.step(), None);
        assert!(drain(&mut rx).is_empty());
        assert_eq!(fwd.open_sources(), 1);
    }

    #[test]
    fn test_transient_read_error_is_reported_and_source_kept() {
        let ws = desktop_with_target();
        let mouse = wheel_mouse();
        let handle = mouse.handle();
        handle.fail_next(io::ErrorKind::Other);
        handle.feed([RawInputEvent::relative(REL_WHEEL, 1)]);
        let (tx, mut rx) = unbounded_channel();
        let mut fwd = ScrollForwarder::new(
            vec![mouse],
            ScriptedReadiness::new(vec![Readiness::Ready(vec![0]), Readiness::Ready(vec![0])]),
            &ws,
            class_query(),
            RelaySettings::default(),
            tx,
        );
        drain(&mut rx);

        fwd.step();
        let after_error = drain(&mut rx);
        fwd.step();

        assert!(matches!(after_error.as_slice(), [RelayEvent::DeviceReadFailed { .. }]));
        assert_eq!(fwd.forwarded(), 1);
        assert_eq!(handle.close_count(), 0);
    }

    #[test]
    fn test_unplugged_source_is_closed_and_forgotten_without_stopping() {
        // Arrange
        let ws = desktop_with_target();
        let unplugged = wheel_mouse();
        let unplugged_handle = unplugged.handle();
        unplugged_handle.disconnect();
        let mouse = wheel_mouse();
        mouse.handle().feed([RawInputEvent::relative(REL_WHEEL, 1)]);
        let readiness = ScriptedReadiness::new(vec![Readiness::Ready(vec![0, 1]), Readiness::Ready(vec![0])]);
        let probe = readiness.clone();
        let (tx, mut rx) = unbounded_channel();
        let mut fwd = ScrollForwarder::new(
            vec![unplugged, mouse],
            readiness,
            &ws,
            class_query(),
            RelaySettings::default(),
            tx,
        );
        drain(&mut rx);

        // Act
        let first = fwd.step();
        let second = fwd.step();

        // Assert
        assert_eq!((first, second), (None, None));
        assert_eq!(unplugged_handle.close_count(), 1);
        assert_eq!(probe.forgotten(), vec![0]);
        assert_eq!(fwd.open_sources(), 1);
        assert_eq!(fwd.forwarded(), 1);
        assert!(drain(&mut rx).contains(&RelayEvent::DeviceRemoved { device: "mouse".to_string() }));
    }

    // ── Stopping ──────────────────────────────────────────────────────────────

    #[test]
    fn test_target_destroyed_stops_loop_and_closes_every_source_once() {
        // Arrange
        let ws = desktop_with_target();
        let first = wheel_mouse();
        let second = wheel_mouse();
        let (h1, h2) = (first.handle(), second.handle());
        let (tx, mut rx) = unbounded_channel();
        let mut fwd = ScrollForwarder::new(
            vec![first, second],
            ScriptedReadiness::new(vec![Readiness::TimedOut, Readiness::Ready(vec![0, 1])]),
            &ws,
            class_query(),
            RelaySettings::default(),
            tx,
        );
        assert_eq!(fwd.step(), None);
        drain(&mut rx);

        // Act: the window goes away; input is pending on both sources.
        ws.destroy(TARGET);
        h1.feed([RawInputEvent::relative(REL_WHEEL, 1)]);
        h2.feed([RawInputEvent::relative(REL_WHEEL, 1)]);
        let stop = fwd.step();

        // Assert
        assert_eq!(stop, Some(StopReason::TargetLost(TARGET)));
        assert_eq!(fwd.state(), ForwarderState::Stopped);
        assert!(fwd.target().is_lost());
        assert_eq!((h1.close_count(), h2.close_count()), (1, 1));
        assert!(ws.button_calls().is_empty());
        assert_eq!(
            drain(&mut rx),
            vec![
                RelayEvent::WindowLost { window: TARGET },
                RelayEvent::Stopped { reason: StopReason::TargetLost(TARGET) },
            ]
        );

        // Further steps neither wait nor inject.
        assert_eq!(fwd.step(), Some(StopReason::TargetLost(TARGET)));
        drop(fwd);
        assert_eq!((h1.close_count(), h2.close_count()), (1, 1));
    }

    #[test]
    fn test_transient_existence_failure_keeps_tracking() {
        let ws = desktop_with_target();
        ws.fail_geometry(TARGET, WindowQueryError::Protocol { request: "GetGeometry", window: TARGET, code: 11 });
        let (tx, _rx) = unbounded_channel();
        let mut fwd = ScrollForwarder::new(
            vec![wheel_mouse()],
            ScriptedReadiness::new(vec![Readiness::TimedOut]),
            &ws,
            class_query(),
            RelaySettings::default(),
            tx,
        );

        assert_eq!(fwd.step(), None);
        assert_eq!(fwd.state(), ForwarderState::Tracking);
    }

    #[test]
    fn test_run_returns_summary_on_interrupt_and_closes_sources() {
        // Arrange: one batch of input, then the scripted wait reports a stop.
        let ws = desktop_with_target();
        let mouse = wheel_mouse();
        let handle = mouse.handle();
        handle.feed([RawInputEvent::relative(REL_WHEEL, 2), RawInputEvent::relative(REL_HWHEEL, -1)]);
        let (tx, mut rx) = unbounded_channel();
        let fwd = ScrollForwarder::new(
            vec![mouse],
            ScriptedReadiness::new(vec![Readiness::Ready(vec![0]), Readiness::Interrupted]),
            &ws,
            class_query(),
            RelaySettings::default(),
            tx,
        );

        // Act
        let summary = fwd.run();

        // Assert
        assert_eq!(summary, RunSummary { reason: StopReason::Interrupted, forwarded: 2 });
        assert_eq!(handle.close_count(), 1);
        assert_eq!(
            drain(&mut rx).last(),
            Some(&RelayEvent::Stopped { reason: StopReason::Interrupted })
        );
    }

    #[test]
    fn test_readiness_failure_stops_the_loop() {
        let ws = desktop_with_target();
        let readiness = ScriptedReadiness::new(vec![]);
        readiness.push_error(io::ErrorKind::InvalidInput);
        let mouse = wheel_mouse();
        let handle = mouse.handle();
        let (tx, _rx) = unbounded_channel();
        let fwd = ScrollForwarder::new(vec![mouse], readiness, &ws, class_query(), RelaySettings::default(), tx);

        let summary = fwd.run();

        assert!(matches!(summary.reason, StopReason::ReadinessFailed(_)));
        assert_eq!(handle.close_count(), 1);
    }

    #[test]
    fn test_eintr_from_wait_is_treated_as_timeout() {
        let ws = desktop_with_target();
        let readiness = ScriptedReadiness::new(vec![]);
        readiness.push_error(io::ErrorKind::Interrupted);
        let (tx, _rx) = unbounded_channel();
        let mut fwd = ScrollForwarder::new(
            vec![wheel_mouse()],
            readiness,
            &ws,
            class_query(),
            RelaySettings::default(),
            tx,
        );

        assert_eq!(fwd.step(), None);
        assert_eq!(fwd.state(), ForwarderState::Tracking);
    }

    #[test]
    fn test_closed_notice_receiver_does_not_break_the_loop() {
        let ws = desktop_with_target();
        let mouse = wheel_mouse();
        mouse.handle().feed([RawInputEvent::relative(REL_WHEEL, 1)]);
        let (tx, rx) = unbounded_channel();
        drop(rx);
        let fwd = ScrollForwarder::new(
            vec![mouse],
            ScriptedReadiness::new(vec![Readiness::Ready(vec![0])]),
            &ws,
            class_query(),
            RelaySettings::default(),
            tx,
        );

        assert_eq!(fwd.run().forwarded, 1);
    }

    // ── Expectation-style tests against the trait ─────────────────────────────

    mock! {
        Display {}
        impl WindowSystem for Display {
            fn root_window(&self) -> WindowHandle;
            fn query_children(&self, window: WindowHandle) -> Result<Vec<WindowHandle>, WindowQueryError>;
            fn class_hint(&self, window: WindowHandle) -> Result<Vec<String>, WindowQueryError>;
            fn map_state(&self, window: WindowHandle) -> Result<MapState, WindowQueryError>;
            fn geometry(&self, window: WindowHandle) -> Result<Geometry, WindowQueryError>;
            fn pointer_position(&self, window: WindowHandle) -> Result<Anchor, WindowQueryError>;
            fn fake_button(
                &self,
                target: WindowHandle,
                button: ScrollButton,
                pressed: bool,
                at: Anchor,
            ) -> Result<(), WindowQueryError>;
            fn flush(&self) -> Result<(), WindowQueryError>;
        }
    }

    fn alive(display: &mut MockDisplay) {
        display
            .expect_geometry()
            .returning(|_| Ok(Geometry { x: 0, y: 0, width: 800, height: 600 }));
    }

    #[test]
    fn test_unviewable_target_never_reaches_the_injection_primitive() {
        // Arrange
        let mut display = MockDisplay::new();
        alive(&mut display);
        display
            .expect_map_state()
            .returning(|_| Ok(MapState::Unviewable));
        display.expect_fake_button().never();
        display.expect_flush().never();
        let mouse = wheel_mouse();
        mouse.handle().feed([RawInputEvent::relative(REL_WHEEL, 4)]);
        let (tx, _rx) = unbounded_channel();

        // Act
        let summary = ScrollForwarder::new(
            vec![mouse],
            ScriptedReadiness::new(vec![Readiness::Ready(vec![0])]),
            display,
            TargetQuery::WindowId(TARGET),
            RelaySettings::default(),
            tx,
        )
        .run();

        // Assert (expectations are verified on drop)
        assert_eq!(summary.forwarded, 0);
    }

    #[test]
    fn test_send_position_comes_from_fallback_when_pointer_unreadable() {
        let mut display = MockDisplay::new();
        alive(&mut display);
        display.expect_map_state().returning(|_| Ok(MapState::Viewable));
        display
            .expect_pointer_position()
            .returning(|w| Err(WindowQueryError::Unavailable { request: "QueryPointer", window: w }));
        display
            .expect_fake_button()
            .withf(|target, button, _, at| {
                *target == TARGET && *button == ScrollButton::Left && *at == Anchor::new(40, 30)
            })
            .times(2)
            .returning(|_, _, _, _| Ok(()));
        display.expect_flush().times(1).returning(|| Ok(()));
        let mouse = wheel_mouse();
        mouse.handle().feed([RawInputEvent::relative(REL_HWHEEL, -1)]);
        let settings = RelaySettings {
            fallback_anchor: Anchor::new(40, 30),
            ..RelaySettings::default()
        };
        let (tx, _rx) = unbounded_channel();

        let summary = ScrollForwarder::new(
            vec![mouse],
            ScriptedReadiness::new(vec![Readiness::Ready(vec![0])]),
            display,
            TargetQuery::WindowId(TARGET),
            settings,
            tx,
        )
        .run();

        assert_eq!(summary.forwarded, 1);
    }
}
