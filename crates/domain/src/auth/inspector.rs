//! Token staleness decisions.
//!
//! Everything here is a pure function of a token string and a clock reading.
//! A token that cannot be decoded is always judged expired, so an unreadable
//! token can never be mistaken for a valid one.

use chrono::{DateTime, TimeDelta, Utc};

use super::claims::{Claims, MalformedToken};

/// Lead time before expiry at which a proactive refresh is triggered.
pub const DEFAULT_EXPIRING_SOON_THRESHOLD_SECS: i64 = 1800;

/// Staleness verdict for a single token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenHealth {
    /// Usable as is.
    Fresh,
    /// Still valid, but within the refresh threshold.
    ExpiringSoon,
    /// Past `exp`, or unreadable.
    Expired,
}

/// Status of the stored token for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenStatus {
    /// No token is stored.
    Absent,
    /// Token is valid and not expiring soon.
    Valid {
        /// Seconds until expiry.
        seconds_remaining: i64,
    },
    /// Token is valid but will be refreshed on the next request.
    Expiring {
        /// Seconds until expiry.
        seconds_remaining: i64,
    },
    /// Token has expired or cannot be read.
    Expired,
}

impl TokenStatus {
    /// Returns true if the token can still be sent.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. } | Self::Expiring { .. })
    }

    /// Get a user-friendly display message.
    #[must_use]
    pub fn display_message(&self) -> String {
        match self {
            Self::Absent => "Not signed in".to_string(),
            Self::Valid { seconds_remaining } => {
                let secs = *seconds_remaining;
                if secs > 3600 {
                    format!("Session valid for {} hours", secs / 3600)
                } else if secs > 60 {
                    format!("Session valid for {} minutes", secs / 60)
                } else {
                    format!("Session valid for {secs} seconds")
                }
            }
            Self::Expiring { seconds_remaining } => {
                format!("Session expiring in {seconds_remaining} seconds (will auto-refresh)")
            }
            Self::Expired => "Session expired".to_string(),
        }
    }
}

/// Decodes tokens and judges their staleness against a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenInspector {
    threshold: TimeDelta,
}

impl TokenInspector {
    /// Creates an inspector with the default 30 minute threshold.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            threshold: TimeDelta::seconds(DEFAULT_EXPIRING_SOON_THRESHOLD_SECS),
        }
    }

    /// Creates an inspector with a custom expiring-soon threshold.
    #[must_use]
    pub const fn with_threshold(threshold: TimeDelta) -> Self {
        Self { threshold }
    }

    /// Returns the expiring-soon threshold.
    #[must_use]
    pub const fn threshold(&self) -> TimeDelta {
        self.threshold
    }

    /// Reads the claims of a token without verifying its signature.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedToken`] for any structurally invalid input.
    pub fn decode(token: &str) -> Result<Claims, MalformedToken> {
        Claims::decode(token)
    }

    /// True if the token is unreadable or `exp <= now`.
    #[must_use]
    #[allow(clippy::unused_self)]
    pub fn is_expired(&self, token: &str, now: DateTime<Utc>) -> bool {
        Claims::decode(token).map_or(true, |claims| claims.exp <= now.timestamp())
    }

    /// True if the token is unreadable or `exp < now + threshold`.
    #[must_use]
    pub fn is_expiring_soon(&self, token: &str, now: DateTime<Utc>) -> bool {
        let horizon = now.timestamp().saturating_add(self.threshold.num_seconds());
        Claims::decode(token).map_or(true, |claims| claims.exp < horizon)
    }

    /// Combines the expiry and expiring-soon checks.
    #[must_use]
    pub fn assess(&self, token: &str, now: DateTime<Utc>) -> TokenHealth {
        if self.is_expired(token, now) {
            TokenHealth::Expired
        } else if self.is_expiring_soon(token, now) {
            TokenHealth::ExpiringSoon
        } else {
            TokenHealth::Fresh
        }
    }

    /// Describes an optional stored token for display.
    #[must_use]
    pub fn status(&self, token: Option<&str>, now: DateTime<Utc>) -> TokenStatus {
        let Some(token) = token else {
            return TokenStatus::Absent;
        };
        let Ok(claims) = Claims::decode(token) else {
            return TokenStatus::Expired;
        };

        let seconds_remaining = claims.exp.saturating_sub(now.timestamp());
        match self.assess(token, now) {
            TokenHealth::Fresh => TokenStatus::Valid { seconds_remaining },
            TokenHealth::ExpiringSoon => TokenStatus::Expiring { seconds_remaining },
            TokenHealth::Expired => TokenStatus::Expired,
        }
    }
}

impl Default for TokenInspector {
    fn default() -> Self {
        Self::new()
    }
}
