//! ScrollInjector: replays one scroll event into the target window as
//! discrete button clicks.
//!
//! One notch becomes one press+release pair of button 4/5/6/7 (see
//! [`wheel_core::ScrollButton`]).  After the batch the connection is flushed
//! so every click reaches the server before the engine goes back to waiting
//! on input.

use wheel_core::{Anchor, InjectionBatch, ScrollAxis, ScrollEvent, WindowHandle};

use super::platform::{WindowQueryError, WindowSystem};

/// Synthesizes scroll clicks into a window.
pub struct ScrollInjector<'a, W: ?Sized> {
    windows: &'a W,
    fallback_anchor: Anchor,
}

impl<'a, W: WindowSystem + ?Sized> ScrollInjector<'a, W> {
    /// `fallback_anchor` is used whenever the pointer position relative to the
    /// target cannot be read.
    pub fn new(windows: &'a W, fallback_anchor: Anchor) -> Self {
        Self { windows, fallback_anchor }
    }

    /// Emits `|delta|` press+release pairs of the mapped button, then flushes.
    ///
    /// Returns the batch that was sent, or `Ok(None)` when there was nothing
    /// to do (no target, or a zero delta).  In the no-op case nothing is sent
    /// to the server, not even a flush.
    ///
    /// # Errors
    ///
    /// Returns the first [`WindowQueryError`] from the button or flush
    /// requests.  Clicks sent before the failure are not retracted.
    pub fn inject(
        &self,
        axis: ScrollAxis,
        delta: i32,
        target: Option<WindowHandle>,
    ) -> Result<Option<InjectionBatch>, WindowQueryError> {
        let Some(target) = target else {
            return Ok(None);
        };

        let batch = InjectionBatch::new(target, ScrollEvent { axis, delta }, self.anchor_for(target));
        if batch.is_empty() {
            return Ok(None);
        }

        for _ in 0..batch.repeat {
            self.windows.fake_button(target, batch.button, true, batch.anchor)?;
            self.windows.fake_button(target, batch.button, false, batch.anchor)?;
        }
        self.windows.flush()?;

        Ok(Some(batch))
    }

    fn anchor_for(&self, target: WindowHandle) -> Anchor {
        self.windows
            .pointer_position(target)
            .unwrap_or(self.fallback_anchor)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
