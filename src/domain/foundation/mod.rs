//! Foundation module - Shared domain primitives.
//!
//! Contains identifiers, timestamps, the state machine trait and the error
//! types used by both the realtime client and the chat session store.

mod errors;
mod ids;
mod state_machine;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{ChatSessionId, ListenerId, MessageId, SubscriptionId};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
