//! Cancellation primitives.
//!
//! A backend supports exactly one of two interruption strategies, fixed for
//! its lifetime at initialization:
//!
//! - **buffer**: the orchestrator writes a sentinel into a shared byte that
//!   the worker's run loop polls at safe points. Non-destructive; state and
//!   command history survive.
//! - **restart**: the worker has no safe interrupt primitive, so the
//!   orchestrator terminates it, spawns a fresh instance and replays the
//!   command history to reconstruct state.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Sentinel written into the interrupt buffer to request cancellation.
pub const INTERRUPT_SENTINEL: u8 = 2;

/// Which cancellation strategy a worker supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterruptStrategy {
    Buffer,
    Restart,
}

/// A single shared byte polled cooperatively by buffer-strategy workers.
///
/// Reset to 0 before each new command; the worker aborts the current
/// evaluation when it observes [`INTERRUPT_SENTINEL`].
#[derive(Debug, Clone, Default)]
pub struct InterruptBuffer(Arc<AtomicU8>);

impl InterruptBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear any pending interrupt. Called before each command starts.
    pub fn reset(&self) {
        self.0.store(0, Ordering::SeqCst);
    }

    /// Request cancellation of the in-flight evaluation.
    pub fn request_interrupt(&self) {
        self.0.store(INTERRUPT_SENTINEL, Ordering::SeqCst);
    }

    /// Polled by the worker's run loop at safe points.
    pub fn is_interrupt_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst) == INTERRUPT_SENTINEL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_starts_clear() {
        let buf = InterruptBuffer::new();
        assert!(!buf.is_interrupt_requested());
    }

    #[test]
    fn sentinel_write_and_reset() {
        let buf = InterruptBuffer::new();
        buf.request_interrupt();
        assert!(buf.is_interrupt_requested());
        buf.reset();
        assert!(!buf.is_interrupt_requested());
    }

    #[test]
    fn clones_share_the_byte() {
        let buf = InterruptBuffer::new();
        let other = buf.clone();
        buf.request_interrupt();
        assert!(other.is_interrupt_requested());
    }

    #[test]
    fn strategy_wire_names() {
        assert_eq!(
            serde_json::to_string(&InterruptStrategy::Buffer).unwrap(),
            "\"buffer\""
        );
        let s: InterruptStrategy = serde_json::from_str("\"restart\"").unwrap();
        assert_eq!(s, InterruptStrategy::Restart);
    }
}
