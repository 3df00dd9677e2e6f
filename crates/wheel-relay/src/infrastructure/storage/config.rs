//! TOML configuration for the relay.
//!
//! The file is optional.  It is looked up in this order:
//!
//! 1. the path given with `--config` (must exist);
//! 2. `$XDG_CONFIG_HOME/wheel-relay/config.toml`;
//! 3. `~/.config/wheel-relay/config.toml`.
//!
//! A missing file in the default locations means "all defaults".
//!
//! ```toml
//! [relay]
//! idle_timeout_ms = 500
//! mode = "xtest"            # or "send-event"
//! fallback_anchor = [100, 100]
//! log_level = "info"
//! ```
//!
//! # Serde default values
//!
//! Every field carries `#[serde(default = "...")]`, so a file that sets only
//! `mode` is valid and the rest keeps its defaults.  Command-line flags are
//! applied on top of the loaded file by the binary.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use wheel_core::Anchor;

use crate::application::forward_scroll::RelaySettings;
use crate::infrastructure::window_system::InjectionMode;

/// Name of the per-user config directory.
const APP_DIR: &str = "wheel-relay";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value parsed but is out of range.
    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RelayConfig {
    #[serde(default)]
    pub relay: RelaySection,
}

/// The `[relay]` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RelaySection {
    /// Upper bound on one readiness wait, in milliseconds.
    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,
    /// How clicks are delivered to the target.
    #[serde(default)]
    pub mode: InjectionMode,
    /// Click position `[x, y]` used when the pointer cannot be read.
    #[serde(default = "default_fallback_anchor")]
    pub fallback_anchor: [i32; 2],
    /// `tracing` filter used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_idle_timeout_ms() -> u64 {
    500
}
fn default_fallback_anchor() -> [i32; 2] {
    [Anchor::FALLBACK.x, Anchor::FALLBACK.y]
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for RelaySection {
    fn default() -> Self {
        Self {
            idle_timeout_ms: default_idle_timeout_ms(),
            mode: InjectionMode::default(),
            fallback_anchor: default_fallback_anchor(),
            log_level: default_log_level(),
        }
    }
}

impl RelayConfig {
    /// Checks value ranges that serde cannot express.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] when `idle_timeout_ms` is zero (the loop
    /// would spin) or `log_level` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.relay.idle_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "relay.idle_timeout_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.relay.log_level.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "relay.log_level",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// The engine tunables described by this config.
    pub fn settings(&self) -> RelaySettings {
        let [x, y] = self.relay.fallback_anchor;
        RelaySettings {
            idle_timeout: Duration::from_millis(self.relay.idle_timeout_ms),
            fallback_anchor: Anchor::new(x, y),
        }
    }
}

// ── Config loading ────────────────────────────────────────────────────────────

/// Parses and validates config text.
///
/// # Errors
///
/// [`ConfigError::Parse`] for malformed TOML, [`ConfigError::Invalid`] for
/// out-of-range values.
pub fn parse_config(content: &str) -> Result<RelayConfig, ConfigError> {
    let cfg: RelayConfig = toml::from_str(content)?;
    cfg.validate()?;
    Ok(cfg)
}

/// Default config file location, if a home directory can be determined.
pub fn default_config_path() -> Option<PathBuf> {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
    Some(base.join(APP_DIR).join("config.toml"))
}

/// Loads the config.
///
/// With `explicit = Some(path)` the file must exist.  Otherwise the default
/// location is tried and a missing file yields [`RelayConfig::default`].
///
/// # Errors
///
/// [`ConfigError::Io`] for file-system errors, plus anything
/// [`parse_config`] returns.
pub fn load_config(explicit: Option<&Path>) -> Result<RelayConfig, ConfigError> {
    let (path, required) = match explicit {
        Some(path) => (path.to_path_buf(), true),
        None => match default_config_path() {
            Some(path) => (path, false),
            None => return Ok(RelayConfig::default()),
        },
    };

    match std::fs::read_to_string(&path) {
        Ok(content) => parse_config(&content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && !required => Ok(RelayConfig::default()),
        Err(source) => Err(ConfigError::Io { path, source }),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
