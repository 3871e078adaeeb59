//! HTTP transport port

use std::future::Future;
use std::pin::Pin;

use leadcrm_domain::{ApiRequest, ApiResponse};
use thiserror::Error;

/// Boxed future returned by [`HttpTransport::send`].
pub type TransportFuture<'a> =
    Pin<Box<dyn Future<Output = Result<ApiResponse, TransportError>> + Send + 'a>>;

/// Failures below the HTTP layer.
///
/// A response with any status code, 401 and 5xx included, is not a
/// transport error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The request URL could not be built.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// No response arrived in time.
    #[error("request timed out after {timeout_ms}ms")]
    Timeout {
        /// Timeout that elapsed.
        timeout_ms: u64,
    },

    /// The connection could not be established.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The request body could not be encoded.
    #[error("invalid body: {0}")]
    InvalidBody(String),

    /// Any other failure.
    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Returns true if the error is a timeout.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Port for sending requests to the CRM REST API.
///
/// Implementations resolve [`ApiRequest::path`] against their configured
/// base URL and send the headers exactly as given.
pub trait HttpTransport: Send + Sync {
    /// Sends a request and returns the complete response.
    fn send<'a>(&'a self, request: &'a ApiRequest) -> TransportFuture<'a>;
}
