//! Wires the concrete adapters into a [`SessionManager`].

use std::sync::Arc;

use leadcrm_application::SessionManager;
use leadcrm_application::ports::TransportError;
use thiserror::Error;
use tracing::info;

use crate::adapters::{ReqwestTransport, SystemClock};
use crate::config::{ConfigError, SessionConfig};
use crate::persistence::FileKeyValueStore;

/// The session manager could not be assembled.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The HTTP client could not be created.
    #[error("cannot create HTTP transport: {0}")]
    Transport(#[from] TransportError),
}

/// Builds a manager talking to `config.api_base_url` over reqwest, keeping
/// the token in `config.storage_path()`.
///
/// # Errors
/// Returns an error if the configuration is invalid or the HTTP client
/// cannot be created.
pub fn build_session_manager(config: &SessionConfig) -> Result<SessionManager, BootstrapError> {
    config.validate()?;
    let base_url = config.api_base_url()?;
    let storage_path = config.storage_path();

    let transport = ReqwestTransport::new(base_url, config.request_timeout())?;
    let storage = FileKeyValueStore::new(&storage_path);

    info!(
        api = %transport.base_url(),
        storage = %storage_path.display(),
        "session manager ready"
    );

    Ok(SessionManager::builder(
        Arc::new(transport),
        Arc::new(storage),
        Arc::new(SystemClock::new()),
    )
    .expiring_soon_threshold(config.expiring_soon_threshold())
    .logout_timeout(config.logout_timeout())
    .build())
}
