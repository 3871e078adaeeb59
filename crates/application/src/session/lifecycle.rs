//! Login, logout and session restore.

use std::sync::Arc;
use std::time::Duration;

use leadcrm_domain::{
    AccessToken, ApiRequest, ApiResponse, Credentials, LoginSuccess, Session, User,
};
use tracing::{debug, error, info, warn};

use super::context::SessionContext;
use super::executor::AuthorizedRequestExecutor;
use super::wire::{LOGIN_PATH, LOGOUT_PATH, LoginRequest, LoginResponse, ME_PATH, MeResponse};
use crate::error::{SessionError, SessionResult};
use crate::ports::TransportError;

/// Upper bound on the best-effort server logout call.
pub const DEFAULT_LOGOUT_TIMEOUT: Duration = Duration::from_secs(5);

/// Entry points that start and end sessions.
#[derive(Debug, Clone)]
pub struct SessionLifecycle {
    context: Arc<SessionContext>,
    executor: Arc<AuthorizedRequestExecutor>,
    logout_timeout: Duration,
}

impl SessionLifecycle {
    /// Creates the lifecycle; `restore` goes through `executor`.
    #[must_use]
    pub const fn new(
        context: Arc<SessionContext>,
        executor: Arc<AuthorizedRequestExecutor>,
        logout_timeout: Duration,
    ) -> Self {
        Self {
            context,
            executor,
            logout_timeout,
        }
    }

    /// Signs in with `credentials`.
    ///
    /// Any previous user is cleared before the call is made. The token and
    /// user are stored only when the server answers with `success: true`.
    ///
    /// # Errors
    ///
    /// [`SessionError::LoginRejected`] for refused credentials,
    /// [`SessionError::Server`], [`SessionError::Transport`] or
    /// [`SessionError::InvalidResponse`] otherwise, and
    /// [`SessionError::Superseded`] if another login or a logout started
    /// before this one finished. Except for the last, no session remains.
    pub async fn login(&self, credentials: &Credentials) -> SessionResult<LoginSuccess> {
        let ctx = &self.context;
        let request = ApiRequest::post(LOGIN_PATH).with_json(&LoginRequest::from(credentials))?;

        let epoch = {
            let gate = ctx.epoch().advance().await;
            ctx.publish(&gate, Session::authenticating());
            gate.epoch()
        };
        info!(username = %credentials.username, %epoch, "logging in");

        let attempt = Self::attempt_login(ctx.transport().send(&request).await);

        let Some(gate) = ctx.epoch().lock_if_current(epoch).await else {
            debug!(%epoch, "login result discarded, session changed");
            return Err(SessionError::Superseded);
        };

        let (token, success) = match attempt {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!(error = %e, "login failed");
                ctx.clear(&gate, "login failed").await;
                return Err(e);
            }
        };

        if let Err(e) = ctx.store().set(&token).await {
            error!(error = %e, "failed to store session token");
            ctx.clear(&gate, "token not stored").await;
            return Err(e.into());
        }
        ctx.publish(&gate, Session::authenticated(success.user.clone()));
        info!(
            user = %success.user.display_name(),
            first_login = success.first_login,
            "logged in"
        );
        Ok(success)
    }

    fn attempt_login(
        response: Result<ApiResponse, TransportError>,
    ) -> SessionResult<(AccessToken, LoginSuccess)> {
        let response = response?;
        if response.status.is_server_error() {
            return Err(SessionError::Server {
                status: response.status.as_u16(),
                message: response.error_message(),
            });
        }
        if !response.is_success() {
            return Err(SessionError::LoginRejected(response.error_message()));
        }

        let body: LoginResponse = response
            .json()
            .map_err(|e| SessionError::InvalidResponse(e.to_string()))?;
        if !body.success {
            return Err(SessionError::LoginRejected(body.failure_message()));
        }

        let token = body
            .token
            .map(AccessToken::from)
            .filter(|token| !token.is_blank())
            .ok_or_else(|| SessionError::InvalidResponse("login response has no token".to_string()))?;
        let user = body
            .user
            .ok_or_else(|| SessionError::InvalidResponse("login response has no user".to_string()))?;

        Ok((
            token,
            LoginSuccess {
                user,
                first_login: body.first_login,
            },
        ))
    }

    /// Ends the session.
    ///
    /// The user is cleared before anything else happens. The server logout
    /// call is best effort and bounded by the logout timeout; its outcome
    /// never blocks or reverts the local cleanup. The token is removed last,
    /// unless a newer login has taken over in the meantime.
    ///
    /// # Errors
    ///
    /// Only [`SessionError::Storage`] if the token could not be removed.
    pub async fn logout(&self) -> SessionResult<()> {
        let ctx = &self.context;
        let epoch = {
            let gate = ctx.epoch().advance().await;
            ctx.publish(&gate, Session::logged_out());
            gate.epoch()
        };
        info!(%epoch, "logging out");

        match ctx.store().get().await {
            Ok(Some(token)) => self.revoke_remotely(&token).await,
            Ok(None) => debug!("no token to revoke"),
            Err(e) => warn!(error = %e, "could not read token for server logout"),
        }

        let Some(_gate) = ctx.epoch().lock_if_current(epoch).await else {
            debug!(%epoch, "newer session began during logout, keeping its token");
            return Ok(());
        };
        ctx.store().remove().await.map_err(|e| {
            error!(error = %e, "failed to remove session token");
            SessionError::from(e)
        })?;
        info!("logged out");
        Ok(())
    }

    async fn revoke_remotely(&self, token: &AccessToken) {
        let request = ApiRequest::post(LOGOUT_PATH).with_bearer(token);
        let call = self.context.transport().send(&request);
        match tokio::time::timeout(self.logout_timeout, call).await {
            Ok(Ok(response)) if response.is_success() => debug!("server session revoked"),
            Ok(Ok(response)) => warn!(
                status = response.status.as_u16(),
                "server logout refused, continuing local logout"
            ),
            Ok(Err(e)) => warn!(error = %e, "server logout failed, continuing local logout"),
            Err(_) => warn!(
                timeout_ms = u64::try_from(self.logout_timeout.as_millis()).unwrap_or(u64::MAX),
                "server logout timed out, continuing local logout"
            ),
        }
    }

    /// Restores the session from a stored token on startup.
    ///
    /// Returns `Ok(None)` without a network call if no token is stored.
    /// Otherwise asks `/auth/me` for the user through the authorized
    /// pipeline, so an expiring token is refreshed first.
    ///
    /// # Errors
    ///
    /// Any failure tears the session down and is returned as is.
    /// [`SessionError::Superseded`] means a login or logout started while the
    /// call was pending; its result was discarded and nothing was torn down.
    pub async fn restore(&self) -> SessionResult<Option<User>> {
        let ctx = &self.context;
        let epoch = ctx.epoch().current().await;

        if ctx.store().get().await?.is_none() {
            debug!("no stored session");
            return Ok(None);
        }

        if let Some(gate) = ctx.epoch().lock_if_current(epoch).await {
            ctx.modify(&gate, |session| {
                let changed = !session.is_loading;
                session.is_loading = true;
                changed
            });
        }
        info!(%epoch, "restoring session");

        let fetched = self
            .executor
            .execute_json::<MeResponse>(ApiRequest::get(ME_PATH))
            .await
            .map(MeResponse::into_user);

        let user = match fetched {
            Ok(user) => user,
            Err(e) => {
                if ctx.teardown(epoch, "restore failed").await {
                    warn!(error = %e, "session restore failed");
                    return Err(e);
                }
                return Err(SessionError::Superseded);
            }
        };

        let Some(gate) = ctx.epoch().lock_if_current(epoch).await else {
            debug!(%epoch, "restored user discarded, session changed");
            return Err(SessionError::Superseded);
        };
        ctx.publish(&gate, Session::authenticated(user.clone()));
        info!(user = %user.display_name(), "session restored");
        Ok(Some(user))
    }

    /// Replaces the signed-in user after a profile edit.
    ///
    /// Returns false, changing nothing, when no one is signed in.
    pub async fn update_user(&self, user: User) -> bool {
        let ctx = &self.context;
        let gate = ctx.epoch().hold().await;
        ctx.modify(&gate, |session| {
            if session.user.is_none() {
                return false;
            }
            session.user = Some(user);
            true
        })
    }
}
