//! Auth endpoint paths and payloads.

use leadcrm_domain::{Credentials, User};
use serde::{Deserialize, Serialize};

/// `POST` with credentials; answers with a token and the user.
pub const LOGIN_PATH: &str = "/auth/login";
/// `POST` with the current token as bearer; answers with a new token.
pub const REFRESH_PATH: &str = "/auth/refresh";
/// `POST` with the current token as bearer; body ignored.
pub const LOGOUT_PATH: &str = "/auth/logout";
/// `GET` with the current token as bearer; answers with the user.
pub const ME_PATH: &str = "/auth/me";

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

impl<'a> From<&'a Credentials> for LoginRequest<'a> {
    fn from(credentials: &'a Credentials) -> Self {
        Self {
            username: &credentials.username,
            password: &credentials.password,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default, rename = "firstLogin", alias = "first_login")]
    pub first_login: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl LoginResponse {
    pub fn failure_message(&self) -> String {
        [self.error.as_deref(), self.message.as_deref()]
            .into_iter()
            .flatten()
            .find(|message| !message.trim().is_empty())
            .unwrap_or("Login failed")
            .to_string()
    }
}

#[derive(Debug, Deserialize)]
pub struct RefreshResponse {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub token: Option<String>,
}

/// `/auth/me` answers `{ user }`; a bare user object is accepted too.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum MeResponse {
    Wrapped { user: User },
    Bare(User),
}

impl MeResponse {
    pub fn into_user(self) -> User {
        match self {
            Self::Wrapped { user } | Self::Bare(user) => user,
        }
    }
}
