//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Realtime Ports
//!
//! - `Transport` - Opens a bidirectional text-frame link to the backend
//! - `EnvelopeHandler` - Receives every decoded inbound envelope
//! - `TopicHandler` - Subscriber callback for one topic
//!
//! ## Storage Ports
//!
//! - `StateStorage` - Durable key/blob storage for the chat store

mod state_storage;
mod topic_handler;
mod transport;

pub use state_storage::{validate_key, StateStorage, StateStorageError};
pub use topic_handler::{EnvelopeHandler, TopicHandler};
pub use transport::{Transport, TransportError, TransportEvent, TransportLink};
