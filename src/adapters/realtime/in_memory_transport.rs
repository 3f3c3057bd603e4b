//! In-memory Transport - scripted links for testing.
//!
//! Every `open` call is recorded with the (possibly paused) Tokio clock so
//! tests can assert on backoff timing. The test plays the server side:
//! pushing frames, closing or failing the latest link, and reading what the
//! client sent.
//!
//! Uses `.expect()` on lock operations, which panics if a lock is poisoned.
//! Production code should use `WebSocketTransport`.

use async_trait::async_trait;
use std::sync::Mutex;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::ports::{Transport, TransportError, TransportEvent, TransportLink};

/// Server side of one opened link.
struct Peer {
    to_client: mpsc::UnboundedSender<TransportEvent>,
    from_client: Option<mpsc::UnboundedReceiver<String>>,
}

#[derive(Default)]
struct Script {
    refuse: bool,
    attempts: Vec<(Instant, String)>,
    peers: Vec<Peer>,
}

/// Scripted transport for tests.
#[derive(Default)]
pub struct InMemoryTransport {
    script: Mutex<Script>,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script
            .lock()
            .expect("InMemoryTransport: script lock poisoned")
    }

    /// While set, every `open` fails with `ConnectFailed`.
    pub fn refuse_connections(&self, refuse: bool) {
        self.script().refuse = refuse;
    }

    /// Number of `open` calls so far, successful or not.
    pub fn open_attempts(&self) -> usize {
        self.script().attempts.len()
    }

    /// Clock reading at each `open` call.
    pub fn attempt_times(&self) -> Vec<Instant> {
        self.script().attempts.iter().map(|(at, _)| *at).collect()
    }

    /// URLs passed to each `open` call.
    pub fn attempted_urls(&self) -> Vec<String> {
        self.script()
            .attempts
            .iter()
            .map(|(_, url)| url.clone())
            .collect()
    }

    /// Delivers a raw text frame on the latest link.
    pub fn push_frame(&self, frame: impl Into<String>) -> bool {
        self.emit(TransportEvent::Frame(frame.into()))
    }

    /// Closes the latest link from the server side.
    pub fn close_link(&self, reason: Option<&str>) -> bool {
        self.emit(TransportEvent::Closed(reason.map(str::to_string)))
    }

    /// Fails the latest link.
    pub fn fail_link(&self, error: &str) -> bool {
        self.emit(TransportEvent::Error(error.to_string()))
    }

    /// Drains frames the client wrote on the latest link.
    pub fn take_sent(&self) -> Vec<String> {
        let mut script = self.script();
        let mut sent = Vec::new();
        if let Some(from_client) = script
            .peers
            .last_mut()
            .and_then(|peer| peer.from_client.as_mut())
        {
            while let Ok(frame) = from_client.try_recv() {
                sent.push(frame);
            }
        }
        sent
    }

    /// Drops the server's end of the client's outbound channel on the latest
    /// link, as if the writer had died. Inbound delivery keeps working.
    pub fn stop_reading_sends(&self) -> bool {
        self.script()
            .peers
            .last_mut()
            .and_then(|peer| peer.from_client.take())
            .is_some()
    }

    /// True once the client has dropped its side of the latest link.
    pub fn latest_link_dropped(&self) -> bool {
        self.script()
            .peers
            .last()
            .map(|peer| peer.to_client.is_closed())
            .unwrap_or(true)
    }

    fn emit(&self, event: TransportEvent) -> bool {
        self.script()
            .peers
            .last()
            .map(|peer| peer.to_client.send(event).is_ok())
            .unwrap_or(false)
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn open(&self, url: &str) -> Result<TransportLink, TransportError> {
        let mut script = self.script();
        script.attempts.push((Instant::now(), url.to_string()));

        if script.refuse {
            return Err(TransportError::ConnectFailed(
                "connection refused".to_string(),
            ));
        }

        let (outbound, from_client) = mpsc::unbounded_channel();
        let (to_client, inbound) = mpsc::unbounded_channel();
        script.peers.push(Peer {
            to_client,
            from_client: Some(from_client),
        });

        Ok(TransportLink { outbound, inbound })
    }
}
