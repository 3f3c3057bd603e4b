//! Realtime Adapters
//!
//! The client side of the topic-multiplexed realtime link.
//!
//! ## Components
//!
//! - **ConnectionManager** - One link, exponential-backoff reconnects
//! - **TopicRegistry** - Per-topic subscriber fan-out, lazy connect
//! - **WebSocketTransport** - tokio-tungstenite implementation of `Transport`
//! - **InMemoryTransport** - Scripted links (testing)
//!
//! ## Usage
//!
//! ```ignore
//! use adapters::realtime::{TopicRegistry, WebSocketTransport};
//!
//! let registry = TopicRegistry::new(
//!     "ws://localhost:8003/ws",
//!     ReconnectPolicy::default(),
//!     Arc::new(WebSocketTransport::new()),
//! );
//! let sub = registry.subscribe_fn("notification", |payload| {
//!     tracing::info!(%payload, "notification");
//! });
//! ```

mod connection_manager;
mod in_memory_transport;
mod topic_registry;
mod websocket_transport;

pub use connection_manager::ConnectionManager;
pub use in_memory_transport::InMemoryTransport;
pub use topic_registry::{Subscription, TopicRegistry, TopicTable};
pub use websocket_transport::WebSocketTransport;
