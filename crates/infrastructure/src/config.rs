//! Session core configuration.
//!
//! Values come from defaults, then an optional JSON file, then `LEADCRM_*`
//! environment variables, later sources winning.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::TimeDelta;
use leadcrm_domain::DEFAULT_EXPIRING_SOON_THRESHOLD_SECS;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Default API base URL.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3000/api";

/// Default log filter.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Prefix of the environment variables read by [`SessionConfig::load`].
pub const ENV_PREFIX: &str = "LEADCRM_";

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("cannot read config file {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The config file is not valid JSON for [`SessionConfig`].
    #[error("invalid config file {path}: {source}")]
    Parse {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        source: serde_json::Error,
    },

    /// An environment override could not be parsed.
    #[error("invalid value for {name}: {value:?}")]
    InvalidEnv {
        /// Variable name.
        name: String,
        /// Raw value.
        value: String,
    },

    /// A value is out of range.
    #[error("invalid {field}: {reason}")]
    Invalid {
        /// Offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

/// Settings for building a session manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Base URL of the CRM REST API; request paths are appended to it.
    pub api_base_url: String,
    /// Per-request timeout, in seconds.
    pub request_timeout_secs: u64,
    /// Upper bound on the best-effort server logout call, in seconds.
    pub logout_timeout_secs: u64,
    /// Lead time before expiry at which requests refresh first, in seconds.
    pub expiring_soon_threshold_secs: i64,
    /// Token file. Defaults to `<data dir>/leadcrm/session.json`.
    pub storage_path: Option<PathBuf>,
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: 30,
            logout_timeout_secs: 5,
            expiring_soon_threshold_secs: DEFAULT_EXPIRING_SOON_THRESHOLD_SECS,
            storage_path: None,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl SessionConfig {
    /// Loads defaults, then `file` if given, then environment overrides,
    /// and validates the result.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, an override
    /// is malformed, or the result fails [`validate`](Self::validate).
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match file {
            Some(path) => Self::load_from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a JSON file. Missing fields take defaults.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Applies `LEADCRM_*` overrides looked up through `lookup`.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidEnv`] for a non-numeric numeric field.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        let var = |suffix: &str| {
            let name = format!("{ENV_PREFIX}{suffix}");
            lookup(&name).map(|value| (name, value))
        };

        if let Some((_, value)) = var("API_BASE_URL") {
            self.api_base_url = value;
        }
        if let Some((name, value)) = var("REQUEST_TIMEOUT_SECS") {
            self.request_timeout_secs = parse_env(name, &value)?;
        }
        if let Some((name, value)) = var("LOGOUT_TIMEOUT_SECS") {
            self.logout_timeout_secs = parse_env(name, &value)?;
        }
        if let Some((name, value)) = var("EXPIRING_SOON_THRESHOLD_SECS") {
            self.expiring_soon_threshold_secs = parse_env(name, &value)?;
        }
        if let Some((_, value)) = var("STORAGE_PATH") {
            self.storage_path = Some(PathBuf::from(value));
        }
        if let Some((_, value)) = var("LOG") {
            self.log_filter = value;
        }
        Ok(())
    }

    /// Checks that every value is usable.
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.api_base_url()?;
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "request_timeout_secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.logout_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "logout_timeout_secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.expiring_soon_threshold_secs < 0 {
            return Err(ConfigError::Invalid {
                field: "expiring_soon_threshold_secs",
                reason: "must not be negative".to_string(),
            });
        }
        Ok(())
    }

    /// Parses the API base URL.
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] unless the URL is absolute http(s).
    pub fn api_base_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.api_base_url).map_err(|e| ConfigError::Invalid {
            field: "api_base_url",
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid {
                field: "api_base_url",
                reason: format!("unsupported scheme {}", url.scheme()),
            });
        }
        Ok(url)
    }

    /// Per-request timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Logout call timeout.
    #[must_use]
    pub const fn logout_timeout(&self) -> Duration {
        Duration::from_secs(self.logout_timeout_secs)
    }

    /// Expiring-soon threshold.
    #[must_use]
    pub const fn expiring_soon_threshold(&self) -> TimeDelta {
        TimeDelta::seconds(self.expiring_soon_threshold_secs)
    }

    /// Token file, falling back to the platform data directory, then the
    /// working directory.
    #[must_use]
    pub fn storage_path(&self) -> PathBuf {
        self.storage_path.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("leadcrm")
                .join("session.json")
        })
    }
}

fn parse_env<T: std::str::FromStr>(name: String, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        name,
        value: value.to_string(),
    })
}
