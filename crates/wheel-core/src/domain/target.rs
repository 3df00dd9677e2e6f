//! The target window and its resolution state machine.
//!
//! ```text
//!   Unresolved ──resolve ok──▶ Resolved ──existence check fails──▶ Lost
//!       ▲  │                                                       (terminal)
//!       └──┘ resolve fails (retry later)
//! ```
//!
//! A [`WindowHandle`] is only a name for a window that lives in the display
//! server.  Holding one does not keep the window alive, and nothing in this
//! crate ever creates or destroys the window it points at.

use std::fmt;

use thiserror::Error;

/// Opaque identifier of a window in the display server's namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowHandle(pub u64);

impl WindowHandle {
    /// Returns the raw server-side id.
    pub fn id(self) -> u64 {
        self.0
    }
}

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// How the target window is selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetQuery {
    /// Search the window tree for a class hint containing this substring
    /// (case-insensitive).
    ClassName(String),
    /// Use this window id directly without searching.
    WindowId(WindowHandle),
}

impl fmt::Display for TargetQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClassName(class) => write!(f, "class '{class}'"),
            Self::WindowId(handle) => write!(f, "window {handle}"),
        }
    }
}

/// Where the endpoint is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionState {
    /// No handle yet; the query is still being retried.
    Unresolved,
    /// A handle is held and assumed to exist.
    Resolved,
    /// The handle is known to be invalid.  Terminal.
    Lost,
}

/// Illegal transitions of the endpoint state machine.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TargetError {
    #[error("target is lost; no further transitions are allowed")]
    AlreadyLost,
    #[error("target is already resolved to {0}")]
    AlreadyResolved(WindowHandle),
    #[error("target has not been resolved yet")]
    NotResolved,
}

/// The single window scroll events are forwarded to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetEndpoint {
    query: TargetQuery,
    handle: Option<WindowHandle>,
    state: ResolutionState,
}

impl TargetEndpoint {
    /// Creates an endpoint for `query`.
    ///
    /// A [`TargetQuery::WindowId`] query starts out `Resolved`; a class-name
    /// query starts `Unresolved`.
    pub fn new(query: TargetQuery) -> Self {
        match query {
            TargetQuery::WindowId(handle) => Self {
                query,
                handle: Some(handle),
                state: ResolutionState::Resolved,
            },
            TargetQuery::ClassName(_) => Self {
                query,
                handle: None,
                state: ResolutionState::Unresolved,
            },
        }
    }

    pub fn query(&self) -> &TargetQuery {
        &self.query
    }

    pub fn state(&self) -> ResolutionState {
        self.state
    }

    /// The held handle, present only while `Resolved`.
    pub fn handle(&self) -> Option<WindowHandle> {
        match self.state {
            ResolutionState::Resolved => self.handle,
            _ => None,
        }
    }

    /// The last handle ever held, including after the target was lost.
    pub fn last_handle(&self) -> Option<WindowHandle> {
        self.handle
    }

    pub fn is_resolved(&self) -> bool {
        self.state == ResolutionState::Resolved
    }

    pub fn is_lost(&self) -> bool {
        self.state == ResolutionState::Lost
    }

    /// `Unresolved → Resolved`.
    ///
    /// # Errors
    ///
    /// Fails if the endpoint is already resolved or lost.
    pub fn resolve(&mut self, handle: WindowHandle) -> Result<(), TargetError> {
        match self.state {
            ResolutionState::Unresolved => {
                self.handle = Some(handle);
                self.state = ResolutionState::Resolved;
                Ok(())
            }
            ResolutionState::Resolved => Err(TargetError::AlreadyResolved(
                self.handle.unwrap_or(handle),
            )),
            ResolutionState::Lost => Err(TargetError::AlreadyLost),
        }
    }

    /// `Resolved → Lost`.  Returns the handle that was lost.
    ///
    /// # Errors
    ///
    /// Fails if the endpoint was never resolved or is already lost.
    pub fn mark_lost(&mut self) -> Result<WindowHandle, TargetError> {
        match (self.state, self.handle) {
            (ResolutionState::Resolved, Some(handle)) => {
                self.state = ResolutionState::Lost;
                Ok(handle)
            }
            (ResolutionState::Lost, _) => Err(TargetError::AlreadyLost),
            _ => Err(TargetError::NotResolved),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
