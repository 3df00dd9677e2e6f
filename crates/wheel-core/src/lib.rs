//! # wheel-core
//!
//! Shared model for wheel-relay: the scroll event filter, the window-target
//! state machine, the tree search used to find the target, and the table that
//! turns scroll notches into synthetic button clicks.
//!
//! It has zero dependencies on OS APIs.  The `wheel-relay` crate plugs real
//! input devices and a real display server into these types.
//!
//! # Architecture overview (for beginners)
//!
//! wheel-relay reads mouse-wheel events straight from the kernel's input
//! devices and replays them as clicks into one chosen window, even when that
//! window would not normally receive them.
//!
//! - **`domain`** – What a scroll event is, which devices have wheels, what
//!   the target window is and whether it is still valid, and how to search the
//!   window tree for it.
//!
//! - **`injection`** – How one scroll event becomes a batch of button 4/5/6/7
//!   press+release pairs.

pub mod domain;
pub mod injection;

// Re-export the most-used types at the crate root so callers can write
// `wheel_core::ScrollEvent` instead of `wheel_core::domain::scroll::ScrollEvent`.
pub use domain::scroll::{RawInputEvent, RelativeAxes, ScrollAxis, ScrollEvent};
pub use domain::target::{ResolutionState, TargetEndpoint, TargetError, TargetQuery, WindowHandle};
pub use domain::window_tree::{class_hint_matches, depth_first_find, TreeSearch};
pub use injection::{Anchor, InjectionBatch, ScrollButton};
