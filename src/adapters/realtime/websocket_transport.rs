//! WebSocket transport built on tokio-tungstenite.
//!
//! Each link runs two pump tasks:
//!
//! ```text
//! outbound mpsc ──► writer pump ──► ws sink
//! ws stream     ──► reader pump ──► inbound mpsc (TransportEvent)
//! ```
//!
//! Dropping the outbound sender ends the writer pump, which sends a close
//! frame. Dropping the inbound receiver ends the reader pump.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use crate::ports::{Transport, TransportError, TransportEvent, TransportLink};

/// Opens real `ws://` / `wss://` links.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketTransport;

impl WebSocketTransport {
    pub fn new() -> Self {
        Self
    }
}

fn validate_url(url: &str) -> Result<(), TransportError> {
    if url.starts_with("ws://") || url.starts_with("wss://") {
        Ok(())
    } else {
        Err(TransportError::InvalidUrl(format!(
            "{url} (expected ws:// or wss://)"
        )))
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn open(&self, url: &str) -> Result<TransportLink, TransportError> {
        validate_url(url)?;

        let (stream, _response) = connect_async(url)
            .await
            .map_err(|e| TransportError::ConnectFailed(e.to_string()))?;
        let (mut sink, mut source) = stream.split();

        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<String>();
        let (events_tx, inbound) = mpsc::unbounded_channel::<TransportEvent>();

        tokio::spawn(async move {
            while let Some(frame) = outbound_rx.recv().await {
                if let Err(e) = sink.send(Message::Text(frame)).await {
                    tracing::debug!(error = %e, "websocket write failed");
                    break;
                }
            }
            let _ = sink.close().await;
        });

        tokio::spawn(async move {
            loop {
                let next = tokio::select! {
                    next = source.next() => next,
                    _ = events_tx.closed() => break,
                };

                let event = match next {
                    Some(Ok(Message::Text(text))) => TransportEvent::Frame(text),
                    Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes) {
                        Ok(text) => TransportEvent::Frame(text),
                        Err(_) => {
                            tracing::debug!("ignoring non-utf8 binary frame");
                            continue;
                        }
                    },
                    Some(Ok(Message::Close(frame))) => {
                        let reason = frame.map(|f| f.reason.into_owned());
                        let _ = events_tx.send(TransportEvent::Closed(reason));
                        break;
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        let _ = events_tx.send(TransportEvent::Error(e.to_string()));
                        break;
                    }
                    None => {
                        let _ = events_tx.send(TransportEvent::Closed(None));
                        break;
                    }
                };

                if events_tx.send(event).is_err() {
                    break;
                }
            }
        });

        Ok(TransportLink { outbound, inbound })
    }
}
