//! Input device adapters.
//!
//! - **`linux`** – evdev enumeration and non-blocking reads
//!   ([`DeviceEnumerator`](crate::application::platform::DeviceEnumerator),
//!   [`InputSource`](crate::application::platform::InputSource)).
//! - **`readiness`** – `poll(2)` over the opened devices plus a wake channel
//!   for shutdown.
//! - **`mock`** – in-memory devices and a scripted readiness wait for tests.

pub mod mock;

#[cfg(target_os = "linux")]
pub mod linux;

#[cfg(unix)]
pub mod readiness;
