//! Adapters for the application ports.

mod reqwest_transport;
mod system_clock;

pub use reqwest_transport::{DEFAULT_REQUEST_TIMEOUT, ReqwestTransport};
pub use system_clock::SystemClock;
