//! Connection manager - owns the single realtime link and its lifecycle.
//!
//! # Lifecycle
//!
//! ```text
//! Disconnected --connect()--> Connecting --open--> Open
//!                                 |                  |
//!                              failure          peer close / error
//!                                 v                  v
//!                          ClosedPendingRetry <------+
//!                                 |
//!                   backoff elapsed -> Connecting
//!                   attempts exhausted -> Disconnected
//! ```
//!
//! `disconnect()` moves any state to `Disconnected` and cancels both the
//! live link and a pending retry timer.
//!
//! # Stale links
//!
//! Every attempt gets a generation number. Events from a link whose
//! generation is no longer current (because the caller disconnected or a
//! newer attempt superseded it) are ignored.

use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::domain::foundation::StateMachine;
use crate::domain::realtime::{ConnectionState, Envelope, RealtimeError, ReconnectPolicy};
use crate::ports::{EnvelopeHandler, Transport, TransportEvent, TransportLink};

/// Mutable link bookkeeping, guarded by one lock.
struct LinkState {
    state: ConnectionState,
    reconnect_attempts: u32,
    reconnect_delay: Duration,
    generation: u64,
    outbound: Option<mpsc::UnboundedSender<String>>,
    link_task: Option<JoinHandle<()>>,
    retry_timer: Option<JoinHandle<()>>,
}

struct Shared {
    url: String,
    policy: ReconnectPolicy,
    transport: Arc<dyn Transport>,
    handler: Arc<dyn EnvelopeHandler>,
    runtime: Handle,
    link: Mutex<LinkState>,
    status: watch::Sender<ConnectionState>,
}

/// Cloneable handle to the realtime connection.
///
/// All clones share one link. Inbound frames are decoded into envelopes and
/// handed to the configured [`EnvelopeHandler`].
#[derive(Clone)]
pub struct ConnectionManager {
    shared: Arc<Shared>,
}

impl ConnectionManager {
    /// Creates a manager in `Disconnected` state.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn new(
        url: impl Into<String>,
        policy: ReconnectPolicy,
        transport: Arc<dyn Transport>,
        handler: Arc<dyn EnvelopeHandler>,
    ) -> Self {
        let (status, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            shared: Arc::new(Shared {
                url: url.into(),
                policy,
                transport,
                handler,
                runtime: Handle::current(),
                link: Mutex::new(LinkState {
                    state: ConnectionState::Disconnected,
                    reconnect_attempts: 0,
                    reconnect_delay: policy.base_delay,
                    generation: 0,
                    outbound: None,
                    link_task: None,
                    retry_timer: None,
                }),
                status,
            }),
        }
    }

    /// Starts a connection attempt.
    ///
    /// No-op while `Connecting` or `Open`. During backoff the pending retry
    /// is cancelled and replaced by an immediate attempt. From
    /// `Disconnected` the retry budget starts fresh.
    pub fn connect(&self) {
        let mut link = self.lock();
        match link.state {
            ConnectionState::Open | ConnectionState::Connecting => {
                tracing::debug!(state = %link.state, "connect ignored");
                return;
            }
            ConnectionState::ClosedPendingRetry => {
                if let Some(timer) = link.retry_timer.take() {
                    timer.abort();
                }
            }
            ConnectionState::Disconnected => {
                link.reconnect_attempts = 0;
                link.reconnect_delay = self.shared.policy.base_delay;
            }
        }
        self.start_attempt(&mut link);
    }

    /// Closes the link and cancels any pending reconnect.
    pub fn disconnect(&self) {
        let mut link = self.lock();
        link.generation += 1;
        if let Some(timer) = link.retry_timer.take() {
            timer.abort();
        }
        if let Some(task) = link.link_task.take() {
            task.abort();
        }
        link.outbound = None;

        if link.state != ConnectionState::Disconnected {
            self.set_state(&mut link, ConnectionState::Disconnected);
            tracing::info!(url = %self.shared.url, "realtime link closed by caller");
        }
    }

    /// Sends `{type: topic, payload}` if the link is open.
    ///
    /// Never queues: when the link is not open the frame is dropped and
    /// `NotConnected` is returned. If the link is open but its writer has
    /// already gone away, `TransportClosed` is returned; the reader reports
    /// the loss and the usual retry follows.
    pub fn send(&self, topic: &str, payload: Value) -> Result<(), RealtimeError> {
        let envelope = Envelope::new(topic, payload)
            .map_err(|e| RealtimeError::InvalidTopic(e.to_string()))?;
        let frame = envelope
            .encode()
            .map_err(|e| RealtimeError::Encode(e.message))?;

        let link = self.lock();
        let state = link.state;
        if !state.accepts_sends() {
            tracing::warn!(topic, state = %state, "dropping send; realtime link is not open");
            return Err(RealtimeError::NotConnected { state });
        }

        match link.outbound.as_ref().map(|outbound| outbound.send(frame)) {
            Some(Ok(())) => {
                tracing::trace!(topic, "frame sent");
                Ok(())
            }
            _ => {
                tracing::warn!(topic, url = %self.shared.url, "dropping send; realtime transport closed");
                Err(RealtimeError::TransportClosed)
            }
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.lock().state
    }

    /// Retries made since the last successful open.
    pub fn reconnect_attempts(&self) -> u32 {
        self.lock().reconnect_attempts
    }

    /// Delay used for the most recently scheduled retry.
    pub fn reconnect_delay(&self) -> Duration {
        self.lock().reconnect_delay
    }

    /// Watch channel that observes every state change.
    pub fn status(&self) -> watch::Receiver<ConnectionState> {
        self.shared.status.subscribe()
    }

    pub fn url(&self) -> &str {
        &self.shared.url
    }

    pub fn policy(&self) -> ReconnectPolicy {
        self.shared.policy
    }

    fn lock(&self) -> MutexGuard<'_, LinkState> {
        self.shared.link.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, link: &mut LinkState, target: ConnectionState) {
        match link.state.transition_to(target) {
            Ok(next) => {
                tracing::debug!(from = %link.state, to = %next, "connection state changed");
                link.state = next;
                self.shared.status.send_replace(next);
            }
            Err(e) => {
                tracing::error!(from = %link.state, to = %target, error = %e, "rejected connection state change");
            }
        }
    }

    fn start_attempt(&self, link: &mut LinkState) {
        self.set_state(link, ConnectionState::Connecting);
        link.generation += 1;
        let generation = link.generation;

        tracing::info!(
            url = %self.shared.url,
            attempt = link.reconnect_attempts,
            "opening realtime link"
        );

        let this = self.clone();
        link.link_task = Some(
            self.shared
                .runtime
                .spawn(async move { this.run_link(generation).await }),
        );
    }

    async fn run_link(self, generation: u64) {
        let opened = self.shared.transport.open(&self.shared.url).await;

        let mut inbound = match opened {
            Ok(TransportLink { outbound, inbound }) => {
                let mut link = self.lock();
                if link.generation != generation {
                    return;
                }
                link.outbound = Some(outbound);
                link.reconnect_attempts = 0;
                link.reconnect_delay = self.shared.policy.base_delay;
                self.set_state(&mut link, ConnectionState::Open);
                tracing::info!(url = %self.shared.url, "realtime link open");
                inbound
            }
            Err(e) => {
                tracing::warn!(url = %self.shared.url, error = %e, "failed to open realtime link");
                self.link_lost(generation);
                return;
            }
        };

        while let Some(event) = inbound.recv().await {
            match event {
                TransportEvent::Frame(text) => self.on_frame(&text),
                TransportEvent::Closed(reason) => {
                    tracing::info!(
                        reason = reason.as_deref().unwrap_or("none"),
                        "realtime link closed by peer"
                    );
                    break;
                }
                TransportEvent::Error(e) => {
                    tracing::warn!(error = %e, "realtime link failed");
                    break;
                }
            }
        }

        self.link_lost(generation);
    }

    fn on_frame(&self, text: &str) {
        match Envelope::decode(text) {
            Ok(envelope) => {
                tracing::trace!(topic = %envelope.topic, "frame received");
                self.shared.handler.handle_envelope(&envelope);
            }
            Err(e) => {
                tracing::warn!(error = %e, "dropping malformed frame");
            }
        }
    }

    fn link_lost(&self, generation: u64) {
        let mut link = self.lock();
        if link.generation != generation {
            return;
        }
        link.outbound = None;
        link.link_task = None;
        self.set_state(&mut link, ConnectionState::ClosedPendingRetry);
        self.schedule_retry(&mut link);
    }

    fn schedule_retry(&self, link: &mut LinkState) {
        let policy = self.shared.policy;
        if !policy.allows_retry(link.reconnect_attempts) {
            tracing::error!(
                url = %self.shared.url,
                attempts = link.reconnect_attempts,
                "reconnect attempts exhausted; giving up"
            );
            self.set_state(link, ConnectionState::Disconnected);
            return;
        }

        link.reconnect_attempts += 1;
        let delay = policy.delay_for_attempt(link.reconnect_attempts);
        link.reconnect_delay = delay;

        tracing::info!(
            attempt = link.reconnect_attempts,
            max_attempts = policy.max_attempts,
            delay_ms = delay.as_millis() as u64,
            "scheduling reconnect"
        );

        let this = self.clone();
        let generation = link.generation;
        link.retry_timer = Some(self.shared.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            this.retry(generation);
        }));
    }

    fn retry(&self, generation: u64) {
        let mut link = self.lock();
        if link.generation != generation || link.state != ConnectionState::ClosedPendingRetry {
            return;
        }
        link.retry_timer = None;
        self.start_attempt(&mut link);
    }
}
