//! Domain entities for wheel-relay.
//!
//! This module contains pure logic with no infrastructure dependencies: it
//! does not open device files and does not talk to a display server.  Code in
//! the outer layers (the `wheel-relay` crate's application and infrastructure
//! modules) depends on these types, never the other way round, so everything
//! here can be unit-tested on any machine.

/// Wheel axes, raw-event filtering, and device capability sets.
pub mod scroll;

/// The target window handle and its `Unresolved → Resolved → Lost` lifecycle.
pub mod target;

/// Iterative pre-order window-tree search and class-hint matching.
pub mod window_tree;
