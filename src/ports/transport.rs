//! Transport Port - Interface for opening a text-frame link to the backend.
//!
//! The connection manager owns at most one link at a time and never sees
//! the underlying socket type, so tests can script the link in memory.

use async_trait::async_trait;
use tokio::sync::mpsc;

/// Errors that can occur while opening a link.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(String),

    #[error("Connection failed: {0}")]
    ConnectFailed(String),
}

/// Lifecycle notification delivered by an open link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// One inbound text frame.
    Frame(String),

    /// The peer closed the link, optionally with a reason.
    Closed(Option<String>),

    /// The link failed; no further events follow.
    Error(String),
}

/// Both directions of an open link.
///
/// Dropping `outbound` asks the transport to close the link.
#[derive(Debug)]
pub struct TransportLink {
    pub outbound: mpsc::UnboundedSender<String>,
    pub inbound: mpsc::UnboundedReceiver<TransportEvent>,
}

/// Port for opening links to the realtime backend
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open a new link to `url`.
    ///
    /// # Errors
    /// Returns `TransportError` if the endpoint is invalid or unreachable
    async fn open(&self, url: &str) -> Result<TransportLink, TransportError>;
}
