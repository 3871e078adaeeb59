//! LeadCRM Infrastructure - Adapters and wiring
//!
//! Concrete implementations of the session core's ports: a reqwest HTTP
//! transport, a JSON file token store and the system clock, plus
//! configuration loading and logging setup.

pub mod adapters;
pub mod bootstrap;
pub mod config;
pub mod persistence;
pub mod telemetry;

pub use adapters::{DEFAULT_REQUEST_TIMEOUT, ReqwestTransport, SystemClock};
pub use bootstrap::{BootstrapError, build_session_manager};
pub use config::{ConfigError, SessionConfig};
pub use persistence::FileKeyValueStore;
pub use telemetry::{TelemetryError, init_tracing};
