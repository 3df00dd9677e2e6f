//! wheel-relay binary entry point.
//!
//! Parses the command line, loads the optional config file, checks
//! privileges, and runs the scroll forwarder on a blocking thread while the
//! async side listens for Ctrl+C and logs the forwarder's notices.
//!
//! # Usage
//!
//! ```text
//! wheel-relay [OPTIONS] <CLASS>
//! wheel-relay [OPTIONS] --window-id <HEX>
//!
//! Arguments:
//!   <CLASS>                  Substring of the target's WM_CLASS (case-insensitive)
//!
//! Options:
//!   --window-id <HEX>        Target an explicit X11 window id instead
//!   --idle-timeout-ms <MS>   Upper bound on one readiness wait [default: 500]
//!   --mode <MODE>            xtest | send-event [default: xtest]
//!   --config <PATH>          Config file [default: ~/.config/wheel-relay/config.toml]
//! ```
//!
//! # Threading model
//!
//! ```text
//! tokio runtime
//!  ├─ ctrl_c task ──── ShutdownHandle::trigger() ──┐
//!  ├─ main: while let Some(notice) = rx.recv()      │ wake fd
//!  │          log_notice(notice)                    ▼
//!  └─ spawn_blocking: scan devices, connect X, ScrollForwarder::run()
//! ```
//!
//! The Xlib connection and the evdev descriptors are created inside the
//! blocking thread and never leave it.

use std::path::PathBuf;

use clap::{ArgGroup, Parser};
use wheel_core::{TargetQuery, WindowHandle};

use wheel_relay::infrastructure::storage::config::RelayConfig;
use wheel_relay::infrastructure::window_system::InjectionMode;

/// Command-line arguments.
#[derive(Debug, Parser)]
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
#[command(
    name = "wheel-relay",
    version,
    about = "Forward scroll-wheel input into one X11 window, even when it is not focused",
    group(ArgGroup::new("target").required(true).args(["class", "window_id"]))
)]
struct Cli {
    /// Substring of the target window's WM_CLASS (instance or class name).
    #[arg(value_name = "CLASS")]
    class: Option<String>,

    /// Explicit target window id, hexadecimal (e.g. `0x3a00007`).
    #[arg(long, value_name = "HEX", value_parser = parse_window_id)]
    window_id: Option<WindowHandle>,

    /// Upper bound on one readiness wait, in milliseconds.
    #[arg(long, value_name = "MS", env = "WHEEL_RELAY_IDLE_TIMEOUT_MS")]
    idle_timeout_ms: Option<u64>,

    /// How scroll clicks are delivered.
    #[arg(long, value_enum)]
    mode: Option<InjectionMode>,

    /// Path to a TOML config file.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
impl Cli {
    fn query(&self) -> TargetQuery {
        match (self.window_id, &self.class) {
            (Some(window), _) => TargetQuery::WindowId(window),
            (None, Some(class)) => TargetQuery::ClassName(class.clone()),
            // The required "target" group makes this unreachable after parsing.
            (None, None) => TargetQuery::ClassName(String::new()),
        }
    }

    /// Command-line values win over the config file.
    fn apply_overrides(&self, config: &mut RelayConfig) {
        if let Some(ms) = self.idle_timeout_ms {
            config.relay.idle_timeout_ms = ms;
        }
        if let Some(mode) = self.mode {
            config.relay.mode = mode;
        }
    }
}

/// Parses `0x3a00007`, `0X3A00007`, or `3a00007`.
fn parse_window_id(text: &str) -> Result<WindowHandle, String> {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    match u64::from_str_radix(digits, 16) {
        Ok(0) => Err("window id must not be zero".to_string()),
        Ok(id) => Ok(WindowHandle(id)),
        Err(e) => Err(format!("'{text}' is not a hexadecimal window id: {e}")),
    }
}

// ── Entry point (Linux) ───────────────────────────────────────────────────────

#[cfg(target_os = "linux")]
mod engine {
    use std::os::fd::{AsRawFd, RawFd};

    use thiserror::Error;
    use tokio::sync::mpsc::UnboundedSender;
    use tracing::{debug, info, trace, warn};
    use wheel_core::TargetQuery;

    use wheel_relay::application::discover_devices::DeviceScanner;
    use wheel_relay::application::forward_scroll::{
        RelayEvent, RelaySettings, RunSummary, ScrollForwarder,
    };
    use wheel_relay::application::platform::InputSource;
    use wheel_relay::infrastructure::input_devices::linux::EvdevEnumerator;
    use wheel_relay::infrastructure::input_devices::readiness::{PollReadiness, WakeReceiver};
    use wheel_relay::infrastructure::window_system::linux::{ConnectError, X11WindowSystem};
    use wheel_relay::infrastructure::window_system::InjectionMode;

    /// Conditions that prevent the forwarder from starting.
    #[derive(Debug, Error)]
    pub enum StartupError {
        #[error("wheel-relay must run as root to read /dev/input (try sudo)")]
        NotRoot,

        #[error("no input device with a scroll wheel could be opened ({skipped} skipped)")]
        NoQualifyingDevices { skipped: usize },

        #[error(transparent)]
        Display(#[from] ConnectError),
    }

    /// Fails unless the effective uid is root.
    pub fn ensure_root() -> Result<(), StartupError> {
        if nix::unistd::Uid::effective().is_root() {
            Ok(())
        } else {
            Err(StartupError::NotRoot)
        }
    }

    /// Scans devices, connects to X, and runs the forwarder to completion.
    ///
    /// Runs on a blocking thread.
    pub fn run(
        query: TargetQuery,
        mode: InjectionMode,
        settings: RelaySettings,
        wake: WakeReceiver,
        notices: UnboundedSender<RelayEvent>,
    ) -> Result<RunSummary, StartupError> {
        let report = DeviceScanner::new(EvdevEnumerator::new()).discover();
        if let Some(error) = &report.enumeration_error {
            warn!(%error, "could not list input devices");
        }
        for skipped in &report.skipped {
            debug!(path = %skipped.path.display(), reason = ?skipped.reason, "skipping input device");
        }
        if report.is_empty() {
            return Err(StartupError::NoQualifyingDevices {
                skipped: report.skipped.len(),
            });
        }
        for source in &report.sources {
            info!(
                device = source.name(),
                path = %source.path().display(),
                axes = ?source.capabilities().scroll_axes(),
                "listening for scroll input"
            );
        }

        let windows = X11WindowSystem::connect(mode)?;
        let fds: Vec<RawFd> = report.sources.iter().map(AsRawFd::as_raw_fd).collect();
        let readiness = PollReadiness::new(&fds, wake);

        let forwarder = ScrollForwarder::new(report.sources, readiness, windows, query, settings, notices);
        Ok(forwarder.run())
    }

    /// Logs one forwarder notice at the level it deserves.
    pub fn log_notice(event: &RelayEvent) {
        match event {
            RelayEvent::WaitingForWindow { query } => {
                info!(%query, "target window not found, waiting for it to appear")
            }
            RelayEvent::WindowFound { window } => info!(%window, "target window found"),
            RelayEvent::WindowLost { window } => info!(%window, "target window closed"),
            RelayEvent::Forwarded { window, axis, delta } => {
                trace!(%window, %axis, delta, "scroll forwarded")
            }
            RelayEvent::InjectionFailed { window, error } => {
                warn!(%window, %error, "failed to inject scroll")
            }
            RelayEvent::DeviceReadFailed { device, error } => {
                warn!(%device, %error, "failed to read input device")
            }
            RelayEvent::DeviceRemoved { device } => warn!(%device, "input device removed"),
            RelayEvent::Stopped { reason } => debug!(?reason, "forwarder stopped"),
        }
    }
}

#[cfg(target_os = "linux")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use anyhow::Context;
    use tokio::sync::mpsc;
    use tracing::{error, info};
    use tracing_subscriber::EnvFilter;
    use wheel_relay::application::forward_scroll::StopReason;
    use wheel_relay::infrastructure::input_devices::readiness::wake_channel;
    use wheel_relay::infrastructure::storage::config::load_config;

    let cli = Cli::parse();

    // ── Configuration ─────────────────────────────────────────────────────────
    let mut config = load_config(cli.config.as_deref()).context("failed to load configuration")?;
    cli.apply_overrides(&mut config);
    config.validate().context("invalid configuration")?;

    // ── Logging setup ─────────────────────────────────────────────────────────
    //
    // RUST_LOG wins; otherwise the config file's log_level applies.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.relay.log_level)),
        )
        .init();

    engine::ensure_root()?;

    let query = cli.query();
    let settings = config.settings();
    let mode = config.relay.mode;
    info!(%query, %mode, idle_timeout_ms = config.relay.idle_timeout_ms, "wheel-relay starting");

    // ── Graceful shutdown ─────────────────────────────────────────────────────
    let (shutdown, wake) = wake_channel().context("failed to create shutdown channel")?;
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C, stopping");
                if let Err(e) = shutdown.trigger() {
                    error!("failed to wake the forwarder: {e}");
                }
            }
            Err(e) => error!("failed to listen for Ctrl+C signal: {e}"),
        }
    });

    // ── Forwarder ─────────────────────────────────────────────────────────────
    let (notices, mut notice_rx) = mpsc::unbounded_channel();
    let forwarder =
        tokio::task::spawn_blocking(move || engine::run(query, mode, settings, wake, notices));

    // The channel closes once the forwarder (and with it the sender) is gone.
    while let Some(notice) = notice_rx.recv().await {
        engine::log_notice(&notice);
    }

    let summary = forwarder.await.context("forwarder thread panicked")??;
    match &summary.reason {
        StopReason::TargetLost(window) => {
            info!(%window, forwarded = summary.forwarded, "target window gone, exiting")
        }
        StopReason::Interrupted => info!(forwarded = summary.forwarded, "stopped"),
        StopReason::ReadinessFailed(reason) => {
            anyhow::bail!("waiting for input failed: {reason}")
        }
    }
    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn main() -> anyhow::Result<()> {
    // Still validate the command line so `--help` works everywhere.
    Cli::parse();
    anyhow::bail!("wheel-relay requires Linux (evdev input devices and an X11 display)")
}

// ── Tests ─────────────────────────────────────────────────────────────────────
