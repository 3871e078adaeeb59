//! Request types for calls made through the session manager.

mod api_request;
mod method;

pub use api_request::{AUTHORIZATION, ApiRequest, Header};
pub use method::HttpMethod;
