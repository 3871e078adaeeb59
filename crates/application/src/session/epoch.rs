//! Epoch gate serializing session-changing writes.

use leadcrm_domain::Epoch;
use tokio::sync::{Mutex, MutexGuard};

/// Holds the current [`Epoch`] behind an async lock.
///
/// A write derived from an async operation takes the gate with
/// [`EpochGate::lock_if_current`] and performs the write while holding the
/// returned guard, so the epoch cannot advance between the check and the
/// write.
#[derive(Debug, Default)]
pub struct EpochGate {
    current: Mutex<Epoch>,
}

/// Proof that the gate is held. The epoch cannot change while it lives.
#[derive(Debug)]
pub struct EpochGuard<'a> {
    guard: MutexGuard<'a, Epoch>,
}

impl EpochGuard<'_> {
    /// Epoch the guard was taken in.
    #[must_use]
    pub fn epoch(&self) -> Epoch {
        *self.guard
    }
}

impl EpochGate {
    /// Creates a gate at [`Epoch::INITIAL`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the current epoch.
    pub async fn current(&self) -> Epoch {
        *self.current.lock().await
    }

    /// Starts a new epoch and returns the gate still held.
    pub async fn advance(&self) -> EpochGuard<'_> {
        let mut guard = self.current.lock().await;
        *guard = guard.next();
        EpochGuard { guard }
    }

    /// Takes the gate in whatever epoch is current.
    pub async fn hold(&self) -> EpochGuard<'_> {
        EpochGuard {
            guard: self.current.lock().await,
        }
    }

    /// Takes the gate only if `epoch` is still current.
    pub async fn lock_if_current(&self, epoch: Epoch) -> Option<EpochGuard<'_>> {
        let guard = self.current.lock().await;
        (*guard == epoch).then_some(EpochGuard { guard })
    }
}
