//! Single-flight token refresh.
//!
//! The first caller to find the slot empty becomes the leader: it occupies
//! the slot before its first suspension point, performs the refresh call and
//! publishes the outcome. Callers arriving while the slot is occupied attach
//! to the leader's outcome instead of issuing their own call.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use leadcrm_domain::{AccessToken, ApiRequest, ApiResponse};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::context::SessionContext;
use super::wire::{REFRESH_PATH, RefreshResponse};
use crate::error::RefreshFailure;
use crate::ports::TransportError;

/// Result of a refresh: the new token, or why there is none.
pub type RefreshOutcome = Result<AccessToken, RefreshFailure>;

type Pending = watch::Receiver<Option<RefreshOutcome>>;

enum Role {
    Leader(watch::Sender<Option<RefreshOutcome>>),
    Follower(Pending),
}

/// Vacates the slot when the leader finishes or is dropped mid-flight,
/// unless a newer leader already holds it.
struct SlotGuard<'a> {
    slot: &'a Mutex<Option<Pending>>,
    own: Pending,
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|held| held.same_channel(&self.own)) {
            slot.take();
        }
    }
}

/// Runs at most one refresh call at a time and shares its outcome.
#[derive(Debug)]
pub struct RefreshCoordinator {
    context: Arc<SessionContext>,
    slot: Mutex<Option<Pending>>,
    network_calls: AtomicU64,
}

impl RefreshCoordinator {
    /// Creates a coordinator over a session context.
    #[must_use]
    pub fn new(context: Arc<SessionContext>) -> Self {
        Self {
            context,
            slot: Mutex::new(None),
            network_calls: AtomicU64::new(0),
        }
    }

    /// Returns true while a refresh is in flight.
    #[must_use]
    pub fn in_flight(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Number of refresh calls sent over the network so far.
    #[must_use]
    pub fn network_calls(&self) -> u64 {
        self.network_calls.load(Ordering::Relaxed)
    }

    /// Obtains a new token, joining an in-flight refresh if there is one.
    ///
    /// On failure the session has been torn down, unless a newer login or
    /// logout had already taken over. If the leader is dropped before it
    /// finishes, a waiting caller takes over and sends the call itself.
    pub async fn refresh(&self) -> RefreshOutcome {
        loop {
            match self.join_or_lead() {
                Role::Follower(pending) => {
                    debug!("joining in-flight refresh");
                    if let Some(outcome) = Self::follow(pending).await {
                        return outcome;
                    }
                    warn!("refresh leader dropped before finishing, taking over");
                }
                Role::Leader(publisher) => {
                    let _vacate = SlotGuard {
                        slot: &self.slot,
                        own: publisher.subscribe(),
                    };
                    let outcome = self.lead().await;
                    publisher.send_replace(Some(outcome.clone()));
                    return outcome;
                }
            }
        }
    }

    fn join_or_lead(&self) -> Role {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(pending) = slot.as_ref().filter(|pending| pending.has_changed().is_ok()) {
            return Role::Follower(pending.clone());
        }
        let (publisher, pending) = watch::channel(None);
        *slot = Some(pending);
        Role::Leader(publisher)
    }

    /// `None` if the leader went away without publishing.
    async fn follow(mut pending: Pending) -> Option<RefreshOutcome> {
        pending
            .wait_for(Option::is_some)
            .await
            .ok()
            .and_then(|outcome| (*outcome).clone())
    }

    async fn lead(&self) -> RefreshOutcome {
        let ctx = &self.context;
        let epoch = ctx.epoch().current().await;

        let current = match ctx.store().get().await {
            Ok(Some(token)) if !ctx.inspector().is_expired(token.as_str(), ctx.now()) => token,
            Ok(_) => {
                debug!("no live token to refresh");
                ctx.teardown(epoch, "no session to refresh").await;
                return Err(RefreshFailure::NoSessionToRefresh);
            }
            Err(e) => {
                ctx.teardown(epoch, "token unreadable").await;
                return Err(RefreshFailure::Storage(e.to_string()));
            }
        };

        self.network_calls.fetch_add(1, Ordering::Relaxed);
        debug!(token = %current.preview(), "refreshing session token");
        let request = ApiRequest::post(REFRESH_PATH).with_bearer(&current);
        let response = ctx.transport().send(&request).await;

        let fresh = match Self::interpret(response, ctx) {
            Ok(token) => token,
            Err(failure) => {
                warn!(error = %failure, "token refresh failed");
                ctx.teardown(epoch, "refresh failed").await;
                return Err(failure);
            }
        };

        let stored = {
            let Some(_gate) = ctx.epoch().lock_if_current(epoch).await else {
                info!(%epoch, "discarding refreshed token from a superseded session");
                return Err(RefreshFailure::Superseded);
            };
            ctx.store().set(&fresh).await
        };

        match stored {
            Ok(()) => {
                info!(token = %fresh.preview(), "session token refreshed");
                Ok(fresh)
            }
            Err(e) => {
                ctx.teardown(epoch, "refreshed token not stored").await;
                Err(RefreshFailure::Storage(e.to_string()))
            }
        }
    }

    fn interpret(
        response: Result<ApiResponse, TransportError>,
        ctx: &SessionContext,
    ) -> RefreshOutcome {
        let response = response.map_err(|e| RefreshFailure::Transport(e.to_string()))?;
        if !response.is_success() {
            return Err(RefreshFailure::Rejected {
                status: response.status.as_u16(),
                message: response.error_message(),
            });
        }

        let body: RefreshResponse = response
            .json()
            .map_err(|e| RefreshFailure::MalformedResponse(e.to_string()))?;
        if body.success == Some(false) {
            return Err(RefreshFailure::Rejected {
                status: response.status.as_u16(),
                message: response.error_message(),
            });
        }

        let token = body
            .token
            .map(AccessToken::from)
            .filter(|token| !token.is_blank())
            .ok_or_else(|| RefreshFailure::MalformedResponse("missing token".to_string()))?;
        if ctx.inspector().is_expired(token.as_str(), ctx.now()) {
            return Err(RefreshFailure::MalformedResponse(
                "token is expired or unreadable".to_string(),
            ));
        }
        Ok(token)
    }
}
