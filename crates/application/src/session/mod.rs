//! Session token lifecycle
//!
//! Components, leaves first:
//! - [`TokenStore`] holds the single persisted token.
//! - [`RefreshCoordinator`] runs at most one refresh call at a time.
//! - [`AuthorizedRequestExecutor`] wraps business calls with expiry checks,
//!   refresh, bearer injection and 401 handling.
//! - [`SessionLifecycle`] owns login, logout and restore.
//! - [`SessionManager`] ties them to one shared context.
//!
//! Writes that result from an async operation go through the epoch gate:
//! `login` and `logout` start a new epoch, and a result produced under an
//! older epoch is dropped instead of applied.

mod context;
mod epoch;
mod executor;
mod lifecycle;
mod manager;
mod refresh;
mod token_store;
mod wire;

pub use context::SessionContext;
pub use epoch::{EpochGate, EpochGuard};
pub use executor::{AuthorizedRequestExecutor, REQUEST_ID_HEADER};
pub use lifecycle::{DEFAULT_LOGOUT_TIMEOUT, SessionLifecycle};
pub use manager::{SessionManager, SessionManagerBuilder};
pub use refresh::{RefreshCoordinator, RefreshOutcome};
pub use token_store::{TOKEN_STORAGE_KEY, TokenStore};
pub use wire::{LOGIN_PATH, LOGOUT_PATH, ME_PATH, REFRESH_PATH};
