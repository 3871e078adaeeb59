//! Session snapshot and related values

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::user::User;

/// Generation counter for session-changing operations.
///
/// `login` and `logout` start a new epoch; results of work begun under an
/// older epoch are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Epoch(u64);

impl Epoch {
    /// The epoch a fresh manager starts in.
    pub const INITIAL: Self = Self(0);

    /// Returns the following epoch.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }

    /// Returns the raw counter value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Externally visible session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// No user.
    LoggedOut,
    /// A login or restore is in progress.
    Authenticating,
    /// A user is signed in.
    Authenticated,
}

/// Snapshot of the user-facing session.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Session {
    /// Signed-in user, if any.
    pub user: Option<User>,
    /// True while a login or restore call is pending.
    pub is_loading: bool,
}

impl Session {
    /// No user, nothing pending.
    #[must_use]
    pub const fn logged_out() -> Self {
        Self {
            user: None,
            is_loading: false,
        }
    }

    /// No user, a login or restore pending.
    #[must_use]
    pub const fn authenticating() -> Self {
        Self {
            user: None,
            is_loading: true,
        }
    }

    /// Signed in as `user`.
    #[must_use]
    pub const fn authenticated(user: User) -> Self {
        Self {
            user: Some(user),
            is_loading: false,
        }
    }

    /// Derived from the presence of a user.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Returns the lifecycle phase this snapshot represents.
    #[must_use]
    pub const fn phase(&self) -> SessionPhase {
        if self.user.is_some() {
            SessionPhase::Authenticated
        } else if self.is_loading {
            SessionPhase::Authenticating
        } else {
            SessionPhase::LoggedOut
        }
    }
}

/// Username and password for `POST /auth/login`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Login name.
    pub username: String,
    /// Password.
    pub password: String,
}

impl Credentials {
    /// Creates credentials.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Outcome of a successful login, handed to the caller for navigation.
#[derive(Debug, Clone, PartialEq)]
pub struct LoginSuccess {
    /// The signed-in user.
    pub user: User,
    /// True if the server asks for first-login onboarding.
    pub first_login: bool,
}
