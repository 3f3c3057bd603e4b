//! Topic handler ports - how decoded frames reach interested code.
//!
//! [`EnvelopeHandler`] is what the connection manager hands every decoded
//! frame to. [`TopicHandler`] is what UI consumers register per topic.

use serde_json::Value;

use crate::domain::foundation::DomainError;
use crate::domain::realtime::Envelope;

/// Callback registered for one topic.
///
/// Implementations should be:
/// - **Quick** - dispatch runs inline on the connection task
/// - **Isolated** - an error or panic is logged and never reaches other handlers
///
/// Closures `Fn(&Value)` implement this trait directly.
///
/// # Example
///
/// ```ignore
/// struct ToastNotifier;
///
/// impl TopicHandler for ToastNotifier {
///     fn handle(&self, payload: &Value) -> Result<(), DomainError> {
///         // show a toast...
///         Ok(())
///     }
///
///     fn name(&self) -> &str {
///         "ToastNotifier"
///     }
/// }
/// ```
pub trait TopicHandler: Send + Sync {
    /// Process one payload.
    fn handle(&self, payload: &Value) -> Result<(), DomainError>;

    /// Handler name for logging.
    fn name(&self) -> &str {
        "anonymous"
    }
}

impl<F> TopicHandler for F
where
    F: Fn(&Value) + Send + Sync,
{
    fn handle(&self, payload: &Value) -> Result<(), DomainError> {
        self(payload);
        Ok(())
    }
}

/// Sink for decoded inbound envelopes.
pub trait EnvelopeHandler: Send + Sync {
    /// Deliver an envelope to whoever is interested in its topic.
    fn handle_envelope(&self, envelope: &Envelope);
}
