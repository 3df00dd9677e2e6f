//! wheel-relay library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does wheel-relay do? (for beginners)
//!
//! Some applications only react to the mouse wheel while they have keyboard
//! focus, or never see wheel input at all because of how the window manager
//! routes it.  wheel-relay works around that:
//!
//! 1. It opens every kernel input device (`/dev/input/event*`) that has a
//!    scroll wheel and watches them all at once.
//! 2. It finds the target window by a substring of its `WM_CLASS` (or by an
//!    explicit window id), waiting for it to appear if necessary.
//! 3. For each wheel notch it synthesizes an X11 scroll-button click
//!    (buttons 4–7) aimed at that window, but only while the window is
//!    actually on screen.
//! 4. When the window is closed, or on Ctrl+C, it releases every device and
//!    exits.
//!
//! The engine itself is [`application::forward_scroll::ScrollForwarder`];
//! everything it touches in the outside world goes through the traits in
//! [`application::platform`].

/// Application layer: use cases and the event loop.
pub mod application;

/// Infrastructure layer: evdev, poll, X11, configuration.
pub mod infrastructure;
