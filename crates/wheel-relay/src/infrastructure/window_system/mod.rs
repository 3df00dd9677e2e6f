//! Display-server adapters.
//!
//! - **`linux`** – Xlib/XTest implementation of
//!   [`WindowSystem`](crate::application::platform::WindowSystem).
//! - **`mock`** – an in-memory window tree that records injected clicks.

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

pub mod mock;

#[cfg(target_os = "linux")]
pub mod linux;

/// How synthetic scroll clicks are delivered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum InjectionMode {
    /// XTest fake button events.  The server treats them like real hardware
    /// input, so they go to whatever window is under the pointer.
    #[default]
    #[serde(rename = "xtest")]
    #[value(name = "xtest")]
    XTest,
    /// `XSendEvent` addressed to the target window at the anchor position.
    /// Reaches windows that are not under the pointer, but some toolkits
    /// ignore events with the `send_event` flag set.
    #[serde(rename = "send-event")]
    #[value(name = "send-event")]
    SendEvent,
}

impl fmt::Display for InjectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InjectionMode::XTest => f.write_str("xtest"),
            InjectionMode::SendEvent => f.write_str("send-event"),
        }
    }
}
