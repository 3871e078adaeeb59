//! Persistent holder for the session token.

use std::fmt;
use std::sync::Arc;

use leadcrm_domain::AccessToken;

use crate::ports::{KeyValueStore, StorageError};

/// Storage key the token is kept under.
pub const TOKEN_STORAGE_KEY: &str = "leadcrm.session.token";

/// Reads and writes the one session token in a [`KeyValueStore`].
#[derive(Clone)]
pub struct TokenStore {
    backend: Arc<dyn KeyValueStore>,
    key: String,
}

impl TokenStore {
    /// Creates a store using [`TOKEN_STORAGE_KEY`].
    #[must_use]
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self::with_key(backend, TOKEN_STORAGE_KEY)
    }

    /// Creates a store under a custom key.
    #[must_use]
    pub fn with_key(backend: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
        }
    }

    /// Returns the storage key in use.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Reads the token. A blank stored value reads as no token.
    ///
    /// # Errors
    /// Returns an error if the backend cannot be read.
    pub async fn get(&self) -> Result<Option<AccessToken>, StorageError> {
        let value = self.backend.get(&self.key).await?;
        Ok(value.map(AccessToken::from).filter(|token| !token.is_blank()))
    }

    /// Replaces the token.
    ///
    /// # Errors
    /// Returns an error if the backend cannot be written.
    pub async fn set(&self, token: &AccessToken) -> Result<(), StorageError> {
        self.backend.set(&self.key, token.as_str()).await
    }

    /// Removes the token.
    ///
    /// # Errors
    /// Returns an error if the backend cannot be written.
    pub async fn remove(&self) -> Result<(), StorageError> {
        self.backend.remove(&self.key).await
    }
}

impl fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenStore").field("key", &self.key).finish_non_exhaustive()
    }
}
