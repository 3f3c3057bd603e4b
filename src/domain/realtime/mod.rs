//! Realtime module - vocabulary of the reconnecting pub/sub client.
//!
//! - [`Envelope`] - `{type, payload}` wire frame
//! - [`ConnectionState`] - link lifecycle, validated through `StateMachine`
//! - [`ReconnectPolicy`] - exponential backoff with a ceiling
//! - [`RealtimeError`] - failures reported by `send`

mod connection_state;
mod envelope;
mod errors;
mod reconnect_policy;

pub use connection_state::ConnectionState;
pub use envelope::Envelope;
pub use errors::RealtimeError;
pub use reconnect_policy::{
    ReconnectPolicy, DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_DELAY,
};
