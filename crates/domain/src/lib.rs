//! LeadCRM Domain - Session core types
//!
//! This crate defines the value types of the session token lifecycle:
//! tokens and their claims, users, session snapshots, and the request and
//! response shapes exchanged with the CRM REST API.
//! All types here are pure Rust with no I/O dependencies.

pub mod auth;
pub mod error;
pub mod request;
pub mod response;
pub mod session;
pub mod user;

pub use auth::{
    AccessToken, Claims, DEFAULT_EXPIRING_SOON_THRESHOLD_SECS, MalformedToken, TokenHealth,
    TokenInspector, TokenStatus,
};
pub use error::{DomainError, DomainResult};
pub use request::{ApiRequest, Header, HttpMethod};
pub use response::{ApiResponse, StatusCode};
pub use session::{Credentials, Epoch, LoginSuccess, Session, SessionPhase};
pub use user::{User, UserId};
