//! Response to an API call

use std::collections::HashMap;
use std::time::Duration;

use serde::de::DeserializeOwned;

use super::StatusCode;

/// A response received from the CRM REST API.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ApiResponse {
    /// HTTP status code.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HashMap<String, String>,
    /// Raw response body.
    pub body: Vec<u8>,
    /// Time from send to last body byte.
    pub duration: Duration,
}

impl ApiResponse {
    /// Creates a response from raw parts.
    #[must_use]
    pub fn new(
        status: impl Into<StatusCode>,
        headers: HashMap<String, String>,
        body: Vec<u8>,
        duration: Duration,
    ) -> Self {
        Self {
            status: status.into(),
            headers,
            body,
            duration,
        }
    }

    /// Creates a response with a JSON body and no headers.
    #[must_use]
    pub fn json_body(status: impl Into<StatusCode>, body: &serde_json::Value) -> Self {
        let mut headers = HashMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        Self::new(status, headers, body.to_string().into_bytes(), Duration::ZERO)
    }

    /// Returns true if the status code indicates success (2xx).
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Decodes the body as `T`.
    ///
    /// An empty body is decoded as JSON `null`, so `Option<T>` and `()`
    /// targets accept `204 No Content`.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if the body does not match `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return serde_json::from_value(serde_json::Value::Null);
        }
        serde_json::from_slice(&self.body)
    }

    /// Decodes the body as an untyped JSON value, if it is JSON at all.
    #[must_use]
    pub fn json_value(&self) -> Option<serde_json::Value> {
        self.json().ok()
    }

    /// Returns the body as a lossy UTF-8 string.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Message to show for a failed call.
    ///
    /// Prefers the server's `error` or `message` field, then the reason
    /// phrase of the status.
    #[must_use]
    pub fn error_message(&self) -> String {
        self.json_value()
            .as_ref()
            .and_then(|body| {
                ["error", "message"]
                    .iter()
                    .find_map(|field| body.get(field).and_then(serde_json::Value::as_str))
            })
            .filter(|message| !message.trim().is_empty())
            .map_or_else(
                || self.status.reason_phrase().to_string(),
                ToString::to_string,
            )
    }

    /// Gets a header value by name (case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}
