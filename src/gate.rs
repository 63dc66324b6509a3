//! Per-backend mutual exclusion.
//!
//! Interruption and command execution are concurrent actors on the same
//! backend state; the gate is the only ordering guarantee between them. Any
//! code path that runs a command must hold the gate, and backend entry
//! points take a [`GateGuard`] reference so misuse is caught at the call
//! site: a guard from a different gate is rejected as a programming error.

use crate::error::BackendError;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

static NEXT_GATE_ID: AtomicU64 = AtomicU64::new(1);

/// Serializes command execution for one backend.
#[derive(Debug, Clone)]
pub struct ExclusiveGate {
    id: u64,
    inner: Arc<Mutex<()>>,
}

/// Proof of gate ownership. Held for the duration of one command.
#[derive(Debug)]
pub struct GateGuard {
    gate_id: u64,
    _permit: OwnedMutexGuard<()>,
}

impl Default for ExclusiveGate {
    fn default() -> Self {
        Self::new()
    }
}

impl ExclusiveGate {
    pub fn new() -> Self {
        Self {
            id: NEXT_GATE_ID.fetch_add(1, Ordering::Relaxed),
            inner: Arc::new(Mutex::new(())),
        }
    }

    /// Wait for and take exclusive ownership.
    pub async fn acquire(&self) -> GateGuard {
        GateGuard {
            gate_id: self.id,
            _permit: Arc::clone(&self.inner).lock_owned().await,
        }
    }

    /// Run `f` while holding the gate.
    pub async fn run_exclusive<T, F, Fut>(&self, f: F) -> T
    where
        F: FnOnce(GateGuard) -> Fut,
        Fut: std::future::Future<Output = T>,
    {
        let guard = self.acquire().await;
        f(guard).await
    }

    /// True while any task holds the gate.
    pub fn is_locked(&self) -> bool {
        self.inner.try_lock().is_err()
    }

    /// Check that `guard` proves ownership of *this* gate.
    pub fn verify(&self, guard: &GateGuard) -> Result<(), BackendError> {
        if guard.gate_id == self.id {
            Ok(())
        } else {
            Err(BackendError::GateNotHeld)
        }
    }
}
