//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `realtime` - Connection manager, topic registry and transports
//! - `storage` - State storage backends (file, in-memory)

pub mod realtime;
pub mod storage;

pub use realtime::{
    ConnectionManager, InMemoryTransport, Subscription, TopicRegistry, TopicTable,
    WebSocketTransport,
};
pub use storage::{FileStateStorage, InMemoryStateStorage};
