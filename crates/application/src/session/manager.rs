//! Session manager facade.

use std::sync::Arc;
use std::time::Duration;

use chrono::TimeDelta;
use leadcrm_domain::{
    AccessToken, ApiRequest, ApiResponse, Credentials, LoginSuccess, Session, TokenInspector,
    TokenStatus, User,
};
use serde::de::DeserializeOwned;
use tokio::sync::watch;

use super::context::SessionContext;
use super::executor::AuthorizedRequestExecutor;
use super::lifecycle::{DEFAULT_LOGOUT_TIMEOUT, SessionLifecycle};
use super::refresh::{RefreshCoordinator, RefreshOutcome};
use super::token_store::{TOKEN_STORAGE_KEY, TokenStore};
use crate::error::SessionResult;
use crate::ports::{Clock, HttpTransport, KeyValueStore};

/// One client session: its token, refresh slot, epoch and user.
///
/// Every instance is independent; two managers never share state unless
/// they are given the same storage backend.
#[derive(Debug)]
pub struct SessionManager {
    context: Arc<SessionContext>,
    refresher: Arc<RefreshCoordinator>,
    executor: Arc<AuthorizedRequestExecutor>,
    lifecycle: SessionLifecycle,
}

impl SessionManager {
    /// Starts building a manager from its three collaborators.
    #[must_use]
    pub fn builder(
        transport: Arc<dyn HttpTransport>,
        storage: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
    ) -> SessionManagerBuilder {
        SessionManagerBuilder {
            transport,
            storage,
            clock,
            threshold: TokenInspector::new().threshold(),
            logout_timeout: DEFAULT_LOGOUT_TIMEOUT,
            storage_key: TOKEN_STORAGE_KEY.to_string(),
        }
    }

    /// Signs in. See [`SessionLifecycle::login`].
    ///
    /// # Errors
    /// See [`SessionLifecycle::login`].
    pub async fn login(&self, credentials: &Credentials) -> SessionResult<LoginSuccess> {
        self.lifecycle.login(credentials).await
    }

    /// Signs out. See [`SessionLifecycle::logout`].
    ///
    /// # Errors
    /// See [`SessionLifecycle::logout`].
    pub async fn logout(&self) -> SessionResult<()> {
        self.lifecycle.logout().await
    }

    /// Restores a stored session. See [`SessionLifecycle::restore`].
    ///
    /// # Errors
    /// See [`SessionLifecycle::restore`].
    pub async fn restore(&self) -> SessionResult<Option<User>> {
        self.lifecycle.restore().await
    }

    /// Replaces the signed-in user. See [`SessionLifecycle::update_user`].
    pub async fn update_user(&self, user: User) -> bool {
        self.lifecycle.update_user(user).await
    }

    /// Sends an authorized request. See [`AuthorizedRequestExecutor::execute`].
    ///
    /// # Errors
    /// See [`AuthorizedRequestExecutor::execute`].
    pub async fn execute(&self, request: ApiRequest) -> SessionResult<ApiResponse> {
        self.executor.execute(request).await
    }

    /// Sends an authorized request and decodes the body.
    ///
    /// # Errors
    /// See [`AuthorizedRequestExecutor::execute_json`].
    pub async fn execute_json<T: DeserializeOwned>(&self, request: ApiRequest) -> SessionResult<T> {
        self.executor.execute_json(request).await
    }

    /// Refreshes the token now, joining an in-flight refresh if any.
    pub async fn refresh(&self) -> RefreshOutcome {
        self.refresher.refresh().await
    }

    /// Current session snapshot.
    #[must_use]
    pub fn session(&self) -> Session {
        self.context.session()
    }

    /// Receiver notified whenever the session changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.context.subscribe()
    }

    /// Returns true if a user is signed in.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.context.session().is_authenticated()
    }

    /// Reads the stored token.
    ///
    /// # Errors
    /// Returns [`crate::SessionError::Storage`] if the store cannot be read.
    pub async fn token(&self) -> SessionResult<Option<AccessToken>> {
        Ok(self.context.store().get().await?)
    }

    /// Describes the stored token for status displays.
    ///
    /// # Errors
    /// Returns [`crate::SessionError::Storage`] if the store cannot be read.
    pub async fn token_status(&self) -> SessionResult<TokenStatus> {
        let token = self.context.store().get().await?;
        Ok(self
            .context
            .inspector()
            .status(token.as_ref().map(AccessToken::as_str), self.context.now()))
    }

    /// Returns true while a refresh call is in flight.
    #[must_use]
    pub fn refresh_in_flight(&self) -> bool {
        self.refresher.in_flight()
    }

    /// Number of refresh calls this manager has sent.
    #[must_use]
    pub fn refresh_calls(&self) -> u64 {
        self.refresher.network_calls()
    }
}

/// Configures a [`SessionManager`].
pub struct SessionManagerBuilder {
    transport: Arc<dyn HttpTransport>,
    storage: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    threshold: TimeDelta,
    logout_timeout: Duration,
    storage_key: String,
}

impl SessionManagerBuilder {
    /// Lead time before expiry at which requests refresh the token first.
    #[must_use]
    pub const fn expiring_soon_threshold(mut self, threshold: TimeDelta) -> Self {
        self.threshold = threshold;
        self
    }

    /// Upper bound on the server logout call.
    #[must_use]
    pub const fn logout_timeout(mut self, timeout: Duration) -> Self {
        self.logout_timeout = timeout;
        self
    }

    /// Storage key for the token.
    #[must_use]
    pub fn storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    /// Builds the manager in the logged-out state.
    #[must_use]
    pub fn build(self) -> SessionManager {
        let context = Arc::new(SessionContext::new(
            TokenStore::with_key(self.storage, self.storage_key),
            self.transport,
            self.clock,
            TokenInspector::with_threshold(self.threshold),
        ));
        let refresher = Arc::new(RefreshCoordinator::new(Arc::clone(&context)));
        let executor = Arc::new(AuthorizedRequestExecutor::new(
            Arc::clone(&context),
            Arc::clone(&refresher),
        ));
        let lifecycle =
            SessionLifecycle::new(Arc::clone(&context), Arc::clone(&executor), self.logout_timeout);

        SessionManager {
            context,
            refresher,
            executor,
            lifecycle,
        }
    }
}

impl std::fmt::Debug for SessionManagerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManagerBuilder")
            .field("threshold", &self.threshold)
            .field("logout_timeout", &self.logout_timeout)
            .field("storage_key", &self.storage_key)
            .finish_non_exhaustive()
    }
}
