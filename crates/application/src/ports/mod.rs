//! Port definitions (interfaces)
//!
//! Ports define the boundaries between the session core and external systems.
//! Each port is a trait that can be implemented by adapters in the infrastructure layer.

mod clock;
mod http_transport;
mod key_value;

pub use clock::Clock;
pub use http_transport::{HttpTransport, TransportError, TransportFuture};
pub use key_value::{InMemoryKeyValueStore, KeyValueStore, StorageError};
