//! Domain layer containing the client's core types and pure logic.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (ids, timestamps, errors, state machine)
//! - `realtime` - Envelope, connection lifecycle and reconnect backoff
//! - `chat` - Chat session state, actions and the reducer

pub mod chat;
pub mod foundation;
pub mod realtime;
