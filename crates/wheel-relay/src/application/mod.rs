//! Application layer use cases for the relay.
//!
//! # What use cases does the relay have?
//!
//! - **`discover_devices`** – Opens every input device node and keeps those
//!   that advertise a vertical or horizontal scroll wheel.
//!
//! - **`locate_window`** – Walks the window tree and finds the first window
//!   whose class hint contains the user's query.
//!
//! - **`track_window`** – Two probes on the held window: is it on screen
//!   right now, and does it exist at all.
//!
//! - **`inject_scroll`** – Turns one scroll event into button 4/5/6/7 clicks
//!   aimed at the target.
//!
//! - **`forward_scroll`** – The event loop composing all of the above.
//!
//! Every use case is written against the traits in **`platform`**; the
//! concrete evdev/X11 adapters and the in-memory mocks live in
//! `infrastructure`.

pub mod discover_devices;
pub mod forward_scroll;
pub mod inject_scroll;
pub mod locate_window;
pub mod platform;
pub mod track_window;
