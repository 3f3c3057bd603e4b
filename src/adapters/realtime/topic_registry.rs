//! Topic registry - maps topics to subscriber callbacks.
//!
//! ```text
//! Topic: report.ready      Topic: scenario.updated
//! ├── sub-a                └── sub-d
//! ├── sub-b
//! └── sub-c
//! ```
//!
//! A frame of type `report.ready` reaches a, b and c in that order. A topic
//! disappears from the table the moment its last subscriber leaves.

use serde_json::Value;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, PoisonError, RwLock, Weak};

use crate::domain::foundation::SubscriptionId;
use crate::domain::realtime::{ConnectionState, Envelope, RealtimeError, ReconnectPolicy};
use crate::ports::{EnvelopeHandler, TopicHandler, Transport};

use super::connection_manager::ConnectionManager;

type HandlerList = Vec<(SubscriptionId, Arc<dyn TopicHandler>)>;

/// Subscriber table shared between the registry and the connection manager.
///
/// Never holds its lock while a handler runs, so handlers may subscribe or
/// unsubscribe from inside a callback.
#[derive(Default)]
pub struct TopicTable {
    topics: RwLock<HashMap<String, HandlerList>>,
}

impl TopicTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a handler. Returns its id and whether the table was empty before.
    fn insert(&self, topic: &str, handler: Arc<dyn TopicHandler>) -> (SubscriptionId, bool) {
        let mut topics = self.topics.write().unwrap_or_else(PoisonError::into_inner);
        let was_empty = topics.is_empty();
        let id = SubscriptionId::new();
        topics
            .entry(topic.to_string())
            .or_default()
            .push((id, handler));
        (id, was_empty)
    }

    /// Removes one handler; drops the topic entry once it is empty.
    fn remove(&self, topic: &str, id: SubscriptionId) -> bool {
        let mut topics = self.topics.write().unwrap_or_else(PoisonError::into_inner);
        let Some(handlers) = topics.get_mut(topic) else {
            return false;
        };

        let before = handlers.len();
        handlers.retain(|(existing, _)| *existing != id);
        let removed = handlers.len() != before;

        if handlers.is_empty() {
            topics.remove(topic);
        }
        removed
    }

    /// Snapshot of the handlers registered for a topic, in registration order.
    fn handlers_for(&self, topic: &str) -> Vec<Arc<dyn TopicHandler>> {
        let topics = self.topics.read().unwrap_or_else(PoisonError::into_inner);
        topics
            .get(topic)
            .map(|handlers| handlers.iter().map(|(_, h)| Arc::clone(h)).collect())
            .unwrap_or_default()
    }

    /// Topics that currently have at least one subscriber.
    pub fn topics(&self) -> Vec<String> {
        let topics = self.topics.read().unwrap_or_else(PoisonError::into_inner);
        let mut keys: Vec<String> = topics.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Returns true if the topic has a table entry.
    pub fn contains_topic(&self, topic: &str) -> bool {
        self.topics
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(topic)
    }

    /// Number of subscribers for a topic (0 if absent).
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(topic)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

impl EnvelopeHandler for TopicTable {
    fn handle_envelope(&self, envelope: &Envelope) {
        let handlers = self.handlers_for(&envelope.topic);
        if handlers.is_empty() {
            tracing::trace!(topic = %envelope.topic, "no subscribers for frame");
            return;
        }

        for handler in handlers {
            let outcome = catch_unwind(AssertUnwindSafe(|| handler.handle(&envelope.payload)));
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::warn!(
                        topic = %envelope.topic,
                        handler = handler.name(),
                        error = %e,
                        "topic subscriber failed"
                    );
                }
                Err(_) => {
                    tracing::warn!(
                        topic = %envelope.topic,
                        handler = handler.name(),
                        "topic subscriber panicked"
                    );
                }
            }
        }
    }
}

/// Handle returned by [`TopicRegistry::subscribe`].
///
/// Unsubscribing removes exactly this callback from exactly this topic.
/// Dropping the handle does not unsubscribe.
#[derive(Debug, Clone)]
#[must_use = "keep the subscription to be able to unsubscribe"]
pub struct Subscription {
    topic: String,
    id: SubscriptionId,
    table: Weak<TopicTable>,
}

impl Subscription {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Removes the callback. Returns false if it was already gone.
    pub fn unsubscribe(self) -> bool {
        let removed = self
            .table
            .upgrade()
            .map_or(false, |table| table.remove(&self.topic, self.id));
        if removed {
            tracing::debug!(topic = %self.topic, subscription = %self.id, "unsubscribed");
        }
        removed
    }
}

/// Topic-based fan-out on top of a lazily opened connection.
///
/// # Example
///
/// ```ignore
/// let registry = TopicRegistry::new(url, ReconnectPolicy::default(), transport);
/// let sub = registry.subscribe_fn("report.ready", |payload| println!("{payload}"));
/// registry.send("report.generate", json!({"id": 7}))?;
/// sub.unsubscribe();
/// ```
#[derive(Clone)]
pub struct TopicRegistry {
    table: Arc<TopicTable>,
    connection: ConnectionManager,
}

impl TopicRegistry {
    /// Builds a registry and the connection manager that feeds it.
    ///
    /// No connection is opened until the first subscription.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn new(url: impl Into<String>, policy: ReconnectPolicy, transport: Arc<dyn Transport>) -> Self {
        let table = Arc::new(TopicTable::new());
        let connection = ConnectionManager::new(url, policy, transport, table.clone());
        Self { table, connection }
    }

    /// Registers `handler` under `topic`.
    ///
    /// The first subscription on an empty registry triggers `connect()`.
    pub fn subscribe(&self, topic: impl Into<String>, handler: Arc<dyn TopicHandler>) -> Subscription {
        let topic = topic.into();
        let (id, was_empty) = self.table.insert(&topic, handler);
        tracing::debug!(topic = %topic, subscription = %id, "subscribed");

        if was_empty {
            self.connection.connect();
        }

        Subscription {
            topic,
            id,
            table: Arc::downgrade(&self.table),
        }
    }

    /// Registers a closure under `topic`.
    pub fn subscribe_fn<F>(&self, topic: impl Into<String>, callback: F) -> Subscription
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.subscribe(topic, Arc::new(callback))
    }

    /// Removes one subscription. Returns false if it was not registered.
    pub fn unsubscribe(&self, topic: &str, id: SubscriptionId) -> bool {
        let removed = self.table.remove(topic, id);
        if removed {
            tracing::debug!(topic, subscription = %id, "unsubscribed");
        }
        removed
    }

    /// Fire-and-forget send of `{type: topic, payload}`.
    pub fn send(&self, topic: &str, payload: Value) -> Result<(), RealtimeError> {
        self.connection.send(topic, payload)
    }

    /// Topics that currently have subscribers.
    pub fn topics(&self) -> Vec<String> {
        self.table.topics()
    }

    pub fn contains_topic(&self, topic: &str) -> bool {
        self.table.contains_topic(topic)
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.table.subscriber_count(topic)
    }

    /// Current state of the underlying connection.
    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// The connection manager feeding this registry.
    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }
}
