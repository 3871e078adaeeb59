//! Authorized request pipeline.

use std::sync::Arc;

use leadcrm_domain::{ApiRequest, ApiResponse, TokenHealth};
use serde::de::DeserializeOwned;
use tracing::{Instrument, debug, info_span, warn};
use uuid::Uuid;

use super::context::SessionContext;
use super::refresh::RefreshCoordinator;
use crate::error::{SessionError, SessionResult};

/// Header correlating a request with client and server logs.
pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// Sends business calls with the session token attached.
///
/// Before each call the stored token is checked: a missing token or an
/// expired one fails without touching the network, and one that is about
/// to expire is refreshed first. A 401 from the server ends the session
/// regardless of what the local check concluded.
#[derive(Debug, Clone)]
pub struct AuthorizedRequestExecutor {
    context: Arc<SessionContext>,
    refresher: Arc<RefreshCoordinator>,
}

impl AuthorizedRequestExecutor {
    /// Creates an executor sharing `refresher`'s single-flight slot.
    #[must_use]
    pub const fn new(context: Arc<SessionContext>, refresher: Arc<RefreshCoordinator>) -> Self {
        Self { context, refresher }
    }

    /// Sends `request` with the session token and returns the 2xx response.
    ///
    /// # Errors
    ///
    /// - [`SessionError::NoSession`], [`SessionError::SessionExpired`],
    ///   [`SessionError::RefreshFailed`] and [`SessionError::Unauthorized`]
    ///   end the session.
    /// - [`SessionError::Server`] for any other non-2xx status.
    /// - [`SessionError::Transport`] if no response arrived.
    pub async fn execute(&self, request: ApiRequest) -> SessionResult<ApiResponse> {
        let request_id = request
            .header(REQUEST_ID_HEADER)
            .map_or_else(|| Uuid::now_v7().to_string(), ToString::to_string);
        let span = info_span!(
            "authorized_request",
            request_id = %request_id,
            method = %request.method,
            path = %request.path,
        );
        self.run(request, request_id).instrument(span).await
    }

    /// Like [`execute`](Self::execute), then decodes the body as `T`.
    ///
    /// An empty body decodes as JSON `null`.
    ///
    /// # Errors
    ///
    /// Everything [`execute`](Self::execute) returns, plus
    /// [`SessionError::InvalidResponse`] if the body does not match `T`.
    pub async fn execute_json<T: DeserializeOwned>(&self, request: ApiRequest) -> SessionResult<T> {
        let response = self.execute(request).await?;
        response
            .json()
            .map_err(|e| SessionError::InvalidResponse(e.to_string()))
    }

    async fn run(&self, request: ApiRequest, request_id: String) -> SessionResult<ApiResponse> {
        request.validate()?;
        let ctx = &self.context;
        let epoch = ctx.epoch().current().await;

        let Some(mut token) = ctx.store().get().await? else {
            debug!("no session token");
            return Err(SessionError::NoSession);
        };

        match ctx.inspector().assess(token.as_str(), ctx.now()) {
            TokenHealth::Fresh => {}
            TokenHealth::ExpiringSoon => {
                debug!("token expiring soon");
                token = self.refresher.refresh().await?;
            }
            TokenHealth::Expired => {
                ctx.teardown(epoch, "token expired").await;
                return Err(SessionError::SessionExpired);
            }
        }

        let mut request = request.with_bearer(&token);
        if request.header(REQUEST_ID_HEADER).is_none() {
            request = request.with_header(REQUEST_ID_HEADER, request_id);
        }

        let response = ctx.transport().send(&request).await?;
        debug!(
            status = response.status.as_u16(),
            elapsed_ms = u64::try_from(response.duration.as_millis()).unwrap_or(u64::MAX),
            "response received"
        );

        if response.status.is_unauthorized() {
            warn!("server rejected session token");
            ctx.teardown(epoch, "server returned 401").await;
            return Err(SessionError::Unauthorized);
        }
        if !response.is_success() {
            return Err(SessionError::Server {
                status: response.status.as_u16(),
                message: response.error_message(),
            });
        }
        Ok(response)
    }
}
