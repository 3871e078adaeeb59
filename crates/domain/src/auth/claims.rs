//! JWT claims reading

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Why a token string could not be read as a claims object.
///
/// Never surfaced to callers of the session manager: an unreadable token is
/// simply treated as expired.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MalformedToken {
    /// The token is not made of three dot-separated segments.
    #[error("expected 3 token segments, found {found}")]
    SegmentCount {
        /// Number of segments present.
        found: usize,
    },

    /// The payload segment is empty.
    #[error("token payload is empty")]
    EmptyPayload,

    /// The payload segment is not valid base64url.
    #[error("token payload is not valid base64url: {0}")]
    InvalidBase64(String),

    /// The payload is not a JSON object with a numeric `exp`.
    #[error("token claims are invalid: {0}")]
    InvalidClaims(String),
}

/// Claims carried in a token payload.
///
/// Only `exp` is interpreted; everything else is kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Expiry instant, in seconds since the Unix epoch.
    #[serde(deserialize_with = "numeric_date")]
    pub exp: i64,
    /// Remaining claims.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Claims {
    /// Reads the claims of a `header.payload.signature` token.
    ///
    /// The signature is ignored.
    ///
    /// # Errors
    ///
    /// Returns a [`MalformedToken`] describing the first structural problem
    /// found. Never panics, whatever the input.
    pub fn decode(token: &str) -> Result<Self, MalformedToken> {
        let segments: Vec<&str> = token.trim().split('.').collect();
        let [_, payload, _] = segments.as_slice() else {
            return Err(MalformedToken::SegmentCount {
                found: segments.len(),
            });
        };

        // Some issuers keep the base64 padding.
        let payload = payload.trim_end_matches('=');
        if payload.is_empty() {
            return Err(MalformedToken::EmptyPayload);
        }

        let bytes = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|e| MalformedToken::InvalidBase64(e.to_string()))?;

        serde_json::from_slice(&bytes).map_err(|e| MalformedToken::InvalidClaims(e.to_string()))
    }

    /// Returns the expiry as a timestamp, if representable.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }

    /// Returns a claim other than `exp` by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&serde_json::Value> {
        self.extra.get(name)
    }
}

/// Accepts integer or fractional seconds; the fraction is dropped.
#[allow(clippy::cast_possible_truncation)]
fn numeric_date<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let number = serde_json::Number::deserialize(deserializer)?;
    if let Some(secs) = number.as_i64() {
        return Ok(secs);
    }
    match number.as_f64() {
        Some(secs) if secs.is_finite() => Ok(secs.trunc() as i64),
        _ => Err(serde::de::Error::custom(format!(
            "exp is not a usable timestamp: {number}"
        ))),
    }
}
