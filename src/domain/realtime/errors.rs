//! Errors reported by the realtime client's public operations.

use thiserror::Error;

use super::ConnectionState;

/// Failures reported by `send`.
///
/// These are returned, never panicked, and always logged at the point they
/// are produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RealtimeError {
    #[error("Connection is not open (state: {state})")]
    NotConnected { state: ConnectionState },

    #[error("Realtime transport closed before the frame could be written")]
    TransportClosed,

    #[error("Failed to encode outbound envelope: {0}")]
    Encode(String),

    #[error("Invalid topic: {0}")]
    InvalidTopic(String),
}
