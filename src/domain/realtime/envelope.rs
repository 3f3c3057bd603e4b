//! Wire envelope exchanged with the realtime backend.
//!
//! Every frame in either direction is a single JSON object:
//!
//! ```text
//! {"type": "<topic>", "payload": <any JSON value>}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::foundation::{DomainError, ErrorCode, ValidationError};

/// A decoded `{type, payload}` frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Topic key the frame is routed by.
    #[serde(rename = "type")]
    pub topic: String,

    /// Arbitrary payload. A frame without one decodes as `null`.
    #[serde(default)]
    pub payload: Value,
}

impl Envelope {
    /// Builds an outbound envelope, rejecting blank topics.
    pub fn new(topic: impl Into<String>, payload: Value) -> Result<Self, ValidationError> {
        let topic = topic.into();
        if topic.trim().is_empty() {
            return Err(ValidationError::empty_field("type"));
        }
        Ok(Self { topic, payload })
    }

    /// Decodes one inbound text frame.
    pub fn decode(frame: &str) -> Result<Self, DomainError> {
        let envelope: Envelope = serde_json::from_str(frame)
            .map_err(|e| DomainError::new(ErrorCode::InvalidEnvelope, e.to_string()))?;
        if envelope.topic.is_empty() {
            return Err(DomainError::new(
                ErrorCode::InvalidEnvelope,
                "frame has an empty type",
            ));
        }
        Ok(envelope)
    }

    /// Encodes the envelope as a single-line JSON frame.
    pub fn encode(&self) -> Result<String, DomainError> {
        serde_json::to_string(self)
            .map_err(|e| DomainError::new(ErrorCode::InvalidEnvelope, e.to_string()))
    }
}
