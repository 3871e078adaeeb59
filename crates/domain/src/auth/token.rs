//! Bearer token newtype

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of leading characters shown by [`AccessToken::preview`].
const PREVIEW_LEN: usize = 8;

/// An opaque bearer credential issued by the CRM API.
///
/// The `Debug` implementation only prints a short preview so tokens do not
/// end up in logs.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    /// Wraps a raw token string.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the raw token string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the token and returns the raw string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Returns true if the token string is empty or whitespace.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Returns the `Authorization` header value for this token.
    #[must_use]
    pub fn bearer_header(&self) -> String {
        format!("Bearer {}", self.0)
    }

    /// Returns the first few characters of the token, for logs and UI.
    #[must_use]
    pub fn preview(&self) -> String {
        let head: String = self.0.chars().take(PREVIEW_LEN).collect();
        if self.0.chars().count() > PREVIEW_LEN {
            format!("{head}...")
        } else {
            head
        }
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AccessToken").field(&self.preview()).finish()
    }
}

impl From<String> for AccessToken {
    fn from(token: String) -> Self {
        Self(token)
    }
}

impl From<&str> for AccessToken {
    fn from(token: &str) -> Self {
        Self(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_bearer_header() {
        let token = AccessToken::new("abc.def.ghi");
        assert_eq!(token.bearer_header(), "Bearer abc.def.ghi");
    }

    #[test]
    fn test_debug_is_redacted() {
        let token = AccessToken::new("eyJhbGciOiJIUzI1NiJ9.secret-payload.signature");
        let debug = format!("{token:?}");
        assert_eq!(debug, "AccessToken(\"eyJhbGci...\")");
        assert!(!debug.contains("secret-payload"));
    }

    #[test]
    fn test_short_token_preview() {
        assert_eq!(AccessToken::new("short").preview(), "short");
    }

    #[test]
    fn test_blank_token() {
        assert!(AccessToken::new("   ").is_blank());
        assert!(!AccessToken::new("a.b.c").is_blank());
    }
}
