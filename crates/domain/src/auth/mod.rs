//! Authentication domain types
//!
//! Token decoding here reads claims only. It never verifies a signature and
//! must not be used as a security check; the server's 401 is authoritative.

mod claims;
mod inspector;
mod token;

pub use claims::{Claims, MalformedToken};
pub use inspector::{
    DEFAULT_EXPIRING_SOON_THRESHOLD_SECS, TokenHealth, TokenInspector, TokenStatus,
};
pub use token::AccessToken;
