//! RealtimeClient - consumer-facing API over the topic registry.
//!
//! Hides the registry/connection split behind the handful of operations UI
//! code needs: subscribe, unsubscribe, send, and connection control.

use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

use crate::adapters::realtime::{Subscription, TopicRegistry};
use crate::config::RealtimeConfig;
use crate::domain::foundation::SubscriptionId;
use crate::domain::realtime::{ConnectionState, RealtimeError, ReconnectPolicy};
use crate::ports::{TopicHandler, Transport};

/// Publish/subscribe client for the realtime backend.
#[derive(Clone)]
pub struct RealtimeClient {
    registry: TopicRegistry,
}

impl RealtimeClient {
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn new(url: impl Into<String>, policy: ReconnectPolicy, transport: Arc<dyn Transport>) -> Self {
        Self {
            registry: TopicRegistry::new(url, policy, transport),
        }
    }

    /// Builds a client from the `realtime` configuration section.
    pub fn from_config(config: &RealtimeConfig, transport: Arc<dyn Transport>) -> Self {
        Self::new(config.url.clone(), config.reconnect_policy(), transport)
    }

    /// Registers a handler; the first subscription opens the connection.
    pub fn subscribe(&self, topic: impl Into<String>, handler: Arc<dyn TopicHandler>) -> Subscription {
        self.registry.subscribe(topic, handler)
    }

    pub fn subscribe_fn<F>(&self, topic: impl Into<String>, callback: F) -> Subscription
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.registry.subscribe_fn(topic, callback)
    }

    /// Subscribes and forwards every payload for `topic` into a channel.
    ///
    /// The forwarding callback stays registered after the receiver is
    /// dropped; unsubscribe through the returned handle.
    pub fn subscribe_channel(
        &self,
        topic: impl Into<String>,
    ) -> (Subscription, mpsc::UnboundedReceiver<Value>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = self.registry.subscribe_fn(topic, move |payload: &Value| {
            let _ = tx.send(payload.clone());
        });
        (subscription, rx)
    }

    pub fn unsubscribe(&self, topic: &str, id: SubscriptionId) -> bool {
        self.registry.unsubscribe(topic, id)
    }

    /// Fire-and-forget; fails with `NotConnected` unless the link is open.
    pub fn send(&self, topic: &str, payload: Value) -> Result<(), RealtimeError> {
        self.registry.send(topic, payload)
    }

    pub fn connect(&self) {
        self.registry.connection().connect();
    }

    /// Closes the link and stops automatic reconnection.
    pub fn disconnect(&self) {
        self.registry.connection().disconnect();
    }

    pub fn state(&self) -> ConnectionState {
        self.registry.connection_state()
    }

    pub fn status(&self) -> watch::Receiver<ConnectionState> {
        self.registry.connection().status()
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.registry.connection().reconnect_attempts()
    }

    pub fn topics(&self) -> Vec<String> {
        self.registry.topics()
    }

    pub fn registry(&self) -> &TopicRegistry {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::realtime::InMemoryTransport;
    use serde_json::json;

    async fn settle() {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
    }

    fn client(transport: &Arc<InMemoryTransport>) -> RealtimeClient {
        RealtimeClient::from_config(&RealtimeConfig::default(), transport.clone())
    }

    #[tokio::test(start_paused = true)]
    async fn first_subscription_connects_and_later_ones_do_not() {
        let transport = Arc::new(InMemoryTransport::new());
        let client = client(&transport);
        assert_eq!(transport.open_attempts(), 0);

        let _a = client.subscribe_fn("notification", |_| {});
        let _b = client.subscribe_fn("report.ready", |_| {});
        settle().await;

        assert_eq!(transport.open_attempts(), 1);
        assert_eq!(transport.attempted_urls(), vec!["ws://localhost:8003/ws"]);
        assert_eq!(client.state(), ConnectionState::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn channel_subscription_receives_payloads() {
        let transport = Arc::new(InMemoryTransport::new());
        let client = client(&transport);
        let (_sub, mut rx) = client.subscribe_channel("notification");
        settle().await;

        transport.push_frame(r#"{"type":"notification","payload":{"text":"hi"}}"#);
        transport.push_frame(r#"{"type":"other","payload":1}"#);

        assert_eq!(rx.recv().await, Some(json!({"text": "hi"})));
        settle().await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn unsubscribed_handler_stops_receiving() {
        let transport = Arc::new(InMemoryTransport::new());
        let client = client(&transport);
        let (sub, mut rx) = client.subscribe_channel("notification");
        settle().await;

        assert!(client.unsubscribe("notification", sub.id()));
        assert!(client.topics().is_empty());
        transport.push_frame(r#"{"type":"notification","payload":1}"#);
        settle().await;

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn send_round_trips_through_transport() {
        let transport = Arc::new(InMemoryTransport::new());
        let client = client(&transport);
        assert!(client.send("report.generate", json!({"id": 1})).is_err());

        client.connect();
        settle().await;
        client.send("report.generate", json!({"id": 1})).unwrap();

        assert_eq!(
            transport.take_sent(),
            vec![r#"{"type":"report.generate","payload":{"id":1}}"#]
        );
    }
}
