//! Infrastructure layer for the relay.
//!
//! Contains OS-facing adapters: evdev input devices, the `poll(2)` readiness
//! wait, the Xlib/XTest window system, and configuration storage.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `wheel_core`, but MUST NOT be imported by the `application` or domain
//! layers (test modules excepted, which use the mocks).
//!
//! # Sub-modules
//!
//! - **`input_devices`** – `EvdevEnumerator`/`EvdevSource` on Linux,
//!   `PollReadiness` with its shutdown wake channel, and in-memory mocks.
//!
//! - **`window_system`** – `X11WindowSystem` on Linux, the `InjectionMode`
//!   switch, and `MockWindowSystem`.
//!
//! - **`storage`** – loading and validating `config.toml`.

pub mod input_devices;
pub mod storage;
pub mod window_system;
