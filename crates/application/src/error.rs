//! Application error types

use leadcrm_domain::DomainError;
use serde_json::json;
use thiserror::Error;

use crate::ports::{StorageError, TransportError};

/// Why a refresh did not produce a new token.
///
/// Every variant except [`Superseded`](Self::Superseded) has torn the
/// session down by the time it is returned. Nothing here is retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RefreshFailure {
    /// No token was stored, or the stored one had already expired.
    #[error("no session to refresh")]
    NoSessionToRefresh,

    /// The refresh call did not reach the server or did not complete.
    #[error("refresh request failed: {0}")]
    Transport(String),

    /// The server answered with a failure.
    #[error("refresh rejected ({status}): {message}")]
    Rejected {
        /// HTTP status of the refresh response.
        status: u16,
        /// Server message or reason phrase.
        message: String,
    },

    /// The server answered 2xx but without a usable token.
    #[error("malformed refresh response: {0}")]
    MalformedResponse(String),

    /// The refreshed token could not be persisted.
    #[error("could not store refreshed token: {0}")]
    Storage(String),

    /// A login or logout began while the refresh was in flight.
    #[error("session changed while refreshing")]
    Superseded,
}

impl RefreshFailure {
    /// Returns true if the session was torn down because of this failure.
    #[must_use]
    pub const fn ends_session(&self) -> bool {
        !matches!(self, Self::Superseded)
    }
}

/// Errors returned by session operations.
///
/// The terminal variants (see [`SessionError::is_terminal`]) guarantee the
/// session was torn down before the error was returned.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// No token is stored.
    #[error("not signed in")]
    NoSession,

    /// The stored token is past its expiry.
    #[error("session expired")]
    SessionExpired,

    /// A proactive refresh failed.
    #[error("session refresh failed: {0}")]
    RefreshFailed(RefreshFailure),

    /// The server rejected the token with 401.
    #[error("unauthorized")]
    Unauthorized,

    /// The login endpoint refused the credentials.
    #[error("login rejected: {0}")]
    LoginRejected(String),

    /// The server answered with a non-2xx status other than 401.
    #[error("server error ({status}): {message}")]
    Server {
        /// HTTP status.
        status: u16,
        /// Server message or reason phrase.
        message: String,
    },

    /// The request did not reach the server or did not complete.
    #[error("network error: {0}")]
    Transport(String),

    /// The server answered with a body that could not be decoded.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The request could not be built.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Token storage failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// A newer login or logout replaced the session this result belonged to.
    #[error("superseded by a newer session change")]
    Superseded,
}

impl SessionError {
    /// Returns true if this error ended the session.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        match self {
            Self::NoSession | Self::SessionExpired | Self::Unauthorized => true,
            Self::RefreshFailed(failure) => failure.ends_session(),
            _ => false,
        }
    }

    /// Stable machine-readable code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NoSession => "no_session",
            Self::SessionExpired => "session_expired",
            Self::RefreshFailed(_) => "refresh_failed",
            Self::Unauthorized => "unauthorized",
            Self::LoginRejected(_) => "login_rejected",
            Self::Server { .. } => "server_error",
            Self::Transport(_) => "network_error",
            Self::InvalidResponse(_) => "invalid_response",
            Self::InvalidRequest(_) => "invalid_request",
            Self::Storage(_) => "storage_error",
            Self::Superseded => "superseded",
        }
    }

    /// Renders the `{ success: false, error, code }` shape UI code checks.
    #[must_use]
    pub fn envelope(&self) -> serde_json::Value {
        json!({
            "success": false,
            "error": self.to_string(),
            "code": self.code(),
        })
    }
}

impl From<RefreshFailure> for SessionError {
    fn from(failure: RefreshFailure) -> Self {
        Self::RefreshFailed(failure)
    }
}

impl From<StorageError> for SessionError {
    fn from(error: StorageError) -> Self {
        Self::Storage(error.to_string())
    }
}

impl From<TransportError> for SessionError {
    fn from(error: TransportError) -> Self {
        Self::Transport(error.to_string())
    }
}

impl From<DomainError> for SessionError {
    fn from(error: DomainError) -> Self {
        Self::InvalidRequest(error.to_string())
    }
}

/// Result type alias for session operations.
pub type SessionResult<T> = Result<T, SessionError>;
