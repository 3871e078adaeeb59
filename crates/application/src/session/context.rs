//! State shared by every session component.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use leadcrm_domain::{Epoch, Session, TokenInspector};
use tokio::sync::watch;
use tracing::{debug, error, info};

use super::epoch::{EpochGate, EpochGuard};
use super::token_store::TokenStore;
use crate::ports::{Clock, HttpTransport};

/// Token store, epoch gate, published session and collaborators of one
/// session manager.
pub struct SessionContext {
    store: TokenStore,
    transport: Arc<dyn HttpTransport>,
    clock: Arc<dyn Clock>,
    inspector: TokenInspector,
    epoch: EpochGate,
    session: watch::Sender<Session>,
}

impl SessionContext {
    /// Creates a context in the logged-out state at the initial epoch.
    #[must_use]
    pub fn new(
        store: TokenStore,
        transport: Arc<dyn HttpTransport>,
        clock: Arc<dyn Clock>,
        inspector: TokenInspector,
    ) -> Self {
        Self {
            store,
            transport,
            clock,
            inspector,
            epoch: EpochGate::new(),
            session: watch::Sender::new(Session::logged_out()),
        }
    }

    /// Token storage.
    #[must_use]
    pub const fn store(&self) -> &TokenStore {
        &self.store
    }

    /// HTTP transport.
    #[must_use]
    pub fn transport(&self) -> &dyn HttpTransport {
        self.transport.as_ref()
    }

    /// Token staleness rules.
    #[must_use]
    pub const fn inspector(&self) -> &TokenInspector {
        &self.inspector
    }

    /// Epoch gate.
    #[must_use]
    pub const fn epoch(&self) -> &EpochGate {
        &self.epoch
    }

    /// Current time according to the injected clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Snapshot of the current session.
    #[must_use]
    pub fn session(&self) -> Session {
        self.session.borrow().clone()
    }

    /// Receiver notified on every session change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.session.subscribe()
    }

    /// Publishes a new session snapshot.
    ///
    /// Takes the epoch guard so only the holder of the gate can publish.
    pub fn publish(&self, _gate: &EpochGuard<'_>, session: Session) {
        self.session.send_replace(session);
    }

    /// Applies `modify` to the session, notifying only if it returns true.
    pub fn modify(&self, _gate: &EpochGuard<'_>, modify: impl FnOnce(&mut Session) -> bool) -> bool {
        self.session.send_if_modified(modify)
    }

    /// Removes the token and clears the user while the gate is held.
    pub async fn clear(&self, gate: &EpochGuard<'_>, reason: &'static str) {
        if let Err(e) = self.store.remove().await {
            error!(error = %e, reason, "failed to remove session token");
        }
        self.publish(gate, Session::logged_out());
        info!(reason, epoch = %gate.epoch(), "session cleared");
    }

    /// Tears the session down unless a newer epoch has begun.
    ///
    /// Returns false if the teardown was discarded as stale.
    pub async fn teardown(&self, epoch: Epoch, reason: &'static str) -> bool {
        let Some(gate) = self.epoch.lock_if_current(epoch).await else {
            debug!(reason, %epoch, "stale teardown discarded");
            return false;
        };
        self.clear(&gate, reason).await;
        true
    }
}

impl fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionContext")
            .field("store", &self.store)
            .field("inspector", &self.inspector)
            .field("epoch", &self.epoch)
            .field("session", &*self.session.borrow())
            .finish_non_exhaustive()
    }
}
