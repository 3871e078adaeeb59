//! LeadCRM Application - Session lifecycle orchestration
//!
//! This crate owns the stateful half of the session core: the token store,
//! single-flight refresh, the authorized request pipeline and the
//! login/logout/restore lifecycle. External systems are reached through the
//! ports in [`ports`]; adapters live in the infrastructure crate.

pub mod error;
pub mod ports;
pub mod session;

pub use error::{RefreshFailure, SessionError, SessionResult};
pub use session::{
    AuthorizedRequestExecutor, RefreshCoordinator, RefreshOutcome, SessionLifecycle,
    SessionManager, SessionManagerBuilder, TOKEN_STORAGE_KEY, TokenStore,
};
