//! Application layer - the consumer-facing services.
//!
//! - `ChatStore` - reducer-driven chat state, persisted after every action
//! - `RealtimeClient` - topic pub/sub over the reconnecting link

mod chat_store;
mod realtime_client;

pub use chat_store::{ChatStore, StateListener};
pub use realtime_client::RealtimeClient;
