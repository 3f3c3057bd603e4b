//! ChatStore - reducer-driven chat state with durable persistence.
//!
//! Every dispatch runs `reduce`, writes the full snapshot to storage, swaps
//! it in, and only then notifies listeners. Dispatches are serialized end to
//! end, so listeners see snapshots in the order they were stored. The whole
//! state lives under a single storage key as one JSON blob.

use serde_json::Value;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::domain::chat::{reduce, ChatAction, ChatState, SessionDeletionPolicy};
use crate::domain::foundation::ListenerId;
use crate::ports::{StateStorage, StateStorageError};

/// Callback invoked with each new snapshot after it was written.
pub type StateListener = Arc<dyn Fn(&ChatState) + Send + Sync>;

/// Single source of truth for chat UI state.
pub struct ChatStore {
    storage: Arc<dyn StateStorage>,
    key: String,
    policy: SessionDeletionPolicy,
    /// Held from reduce through notify; dispatches never interleave.
    dispatching: Mutex<()>,
    /// Swapped under `dispatching`, read freely by `get_state`.
    state: RwLock<Arc<ChatState>>,
    listeners: RwLock<Vec<(ListenerId, StateListener)>>,
    persisted: AtomicBool,
}

impl ChatStore {
    /// Rehydrates from `storage[key]`, falling back to the default state
    /// when the blob is missing, unreadable or corrupt.
    pub fn load(
        storage: Arc<dyn StateStorage>,
        key: impl Into<String>,
        policy: SessionDeletionPolicy,
    ) -> Self {
        let key = key.into();
        let state = rehydrate(storage.as_ref(), &key);

        Self {
            storage,
            key,
            policy,
            dispatching: Mutex::new(()),
            state: RwLock::new(Arc::new(state)),
            listeners: RwLock::new(Vec::new()),
            persisted: AtomicBool::new(true),
        }
    }

    /// Current snapshot.
    pub fn get_state(&self) -> Arc<ChatState> {
        Arc::clone(&self.state.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Applies `action`, persists the result, then notifies listeners.
    ///
    /// Never fails. A failed write is logged and leaves the new state in
    /// memory with [`is_persisted`](Self::is_persisted) reporting `false`.
    ///
    /// Listeners run before this returns and must not call `dispatch`
    /// themselves; doing so deadlocks. [`get_state`](Self::get_state) is safe.
    pub fn dispatch(&self, action: ChatAction) -> Arc<ChatState> {
        let kind = action.kind();
        let _turn = self
            .dispatching
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let next = Arc::new(reduce(&self.get_state(), action, self.policy));

        match self.persist(&next) {
            Ok(()) => self.persisted.store(true, Ordering::SeqCst),
            Err(e) => {
                tracing::error!(key = %self.key, action = kind, error = %e, "failed to persist chat state");
                self.persisted.store(false, Ordering::SeqCst);
            }
        }

        *self.state.write().unwrap_or_else(PoisonError::into_inner) = Arc::clone(&next);

        tracing::debug!(action = kind, "chat action applied");
        self.notify(&next);
        next
    }

    /// Decodes an untyped `{type, payload}` action and dispatches it.
    ///
    /// Unknown kinds and malformed payloads leave the state untouched.
    pub fn dispatch_json(&self, action: Value) -> Arc<ChatState> {
        let kind = action
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("<missing>")
            .to_string();

        match serde_json::from_value::<ChatAction>(action) {
            Ok(action) => self.dispatch(action),
            Err(e) => {
                tracing::warn!(action = %kind, error = %e, "ignoring unrecognised chat action");
                self.get_state()
            }
        }
    }

    /// False while the in-memory state is ahead of storage.
    pub fn is_persisted(&self) -> bool {
        self.persisted.load(Ordering::SeqCst)
    }

    /// Registers a listener for future snapshots.
    pub fn subscribe<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&ChatState) + Send + Sync + 'static,
    {
        let id = ListenerId::new();
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(listener)));
        id
    }

    /// Removes a listener. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    pub fn storage_key(&self) -> &str {
        &self.key
    }

    pub fn deletion_policy(&self) -> SessionDeletionPolicy {
        self.policy
    }

    fn persist(&self, state: &ChatState) -> Result<(), StateStorageError> {
        let blob = serde_json::to_string(state)
            .map_err(|e| StateStorageError::SerializationFailed(e.to_string()))?;
        self.storage.save(&self.key, &blob)
    }

    fn notify(&self, state: &ChatState) {
        let listeners: Vec<StateListener> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in listeners {
            if catch_unwind(AssertUnwindSafe(|| listener(state))).is_err() {
                tracing::warn!("chat state listener panicked");
            }
        }
    }
}

fn rehydrate(storage: &dyn StateStorage, key: &str) -> ChatState {
    let blob = match storage.load(key) {
        Ok(Some(blob)) => blob,
        Ok(None) => {
            tracing::debug!(key, "no stored chat state; using defaults");
            return ChatState::default();
        }
        Err(e) => {
            tracing::warn!(key, error = %e, "failed to read chat state; using defaults");
            return ChatState::default();
        }
    };

    match serde_json::from_str::<ChatState>(&blob) {
        Ok(mut state) => {
            if state.normalize() {
                tracing::warn!(key, "stored chat state violated invariants; repaired");
            }
            state
        }
        Err(e) => {
            tracing::warn!(key, error = %e, "stored chat state is corrupt; using defaults");
            ChatState::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::InMemoryStateStorage;
    use crate::domain::chat::{Bookmark, ChatMessage, ChatSession, MessageSender};
    use crate::domain::foundation::{ChatSessionId, MessageId};
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    const KEY: &str = "chatState";

    fn store_over(storage: &InMemoryStateStorage) -> ChatStore {
        ChatStore::load(
            Arc::new(storage.clone()),
            KEY,
            SessionDeletionPolicy::default(),
        )
    }

    mod loading {
        use super::*;

        #[test]
        fn missing_blob_yields_default_state() {
            let storage = InMemoryStateStorage::new();
            let store = store_over(&storage);
            assert_eq!(*store.get_state(), ChatState::default());
            assert_eq!(storage.write_count(), 0);
        }

        #[test]
        fn corrupt_blob_yields_default_state() {
            let storage = InMemoryStateStorage::with_blob(KEY, "{not json");
            let store = store_over(&storage);
            assert_eq!(*store.get_state(), ChatState::default());
        }

        #[test]
        fn stored_blob_is_rehydrated() {
            let storage = InMemoryStateStorage::with_blob(
                KEY,
                r#"{"input":"draft","chatSessions":[{"id":4,"name":"Ops"}],"currentSessionId":4}"#,
            );
            let store = store_over(&storage);

            let state = store.get_state();
            assert_eq!(state.input, "draft");
            assert_eq!(state.current_session_id, ChatSessionId::new(4));
        }

        #[test]
        fn invariant_violations_are_repaired_on_load() {
            let storage = InMemoryStateStorage::with_blob(
                KEY,
                r#"{"chatSessions":[],"bookmarkedMessages":[{"messageId":"m1","position":1},{"messageId":"m1","position":2}]}"#,
            );
            let store = store_over(&storage);

            let state = store.get_state();
            assert_eq!(state.chat_sessions.len(), 1);
            assert_eq!(state.bookmarked_messages.len(), 1);
            assert_eq!(state.bookmarked_messages[0].position, 1.0);
        }

        #[test]
        fn unknown_sender_does_not_discard_stored_state() {
            let storage = InMemoryStateStorage::with_blob(
                KEY,
                r#"{"input":"draft","chatSessions":[{"id":4,"name":"Ops"}],"currentSessionId":4,
                    "messages":[{"id":"m1","sender":"bot","text":"beep"}]}"#,
            );
            let store = store_over(&storage);

            let state = store.get_state();
            assert_eq!(state.input, "draft");
            assert_eq!(state.chat_sessions, vec![ChatSession::new(ChatSessionId::new(4), "Ops")]);
            assert_eq!(state.messages[0].sender, MessageSender::Other("bot".into()));
        }

        #[test]
        fn unmodelled_message_fields_are_written_back() {
            let storage = InMemoryStateStorage::with_blob(
                KEY,
                r#"{"messages":[{"id":"m1","sender":"user","text":"hi","reactions":["+1"]}]}"#,
            );
            let store = store_over(&storage);

            store.dispatch(ChatAction::SetInput("next".into()));

            let blob: Value = serde_json::from_str(&storage.blob(KEY).unwrap()).unwrap();
            assert_eq!(blob["messages"][0]["reactions"], json!(["+1"]));
            assert_eq!(blob["messages"][0]["sender"], json!("user"));
        }
    }

    mod dispatching {
        use super::*;

        #[test]
        fn dispatch_writes_before_notifying() {
            let storage = InMemoryStateStorage::new();
            let store = store_over(&storage);

            let observed = Arc::new(Mutex::new(None));
            let reader = storage.clone();
            let slot = observed.clone();
            store.subscribe(move |_| {
                *slot.lock().unwrap() = reader.blob(KEY);
            });

            store.dispatch(ChatAction::SetInput("hello".into()));

            let blob = observed.lock().unwrap().clone().expect("written before notify");
            let persisted: ChatState = serde_json::from_str(&blob).unwrap();
            assert_eq!(persisted.input, "hello");
        }

        #[test]
        fn add_chat_session_moves_to_front_and_becomes_current() {
            let storage = InMemoryStateStorage::new();
            let store = store_over(&storage);

            let state = store.dispatch(ChatAction::AddChatSession(ChatSession::new(
                ChatSessionId::new(2),
                "X",
            )));

            assert_eq!(state.current_session_id, ChatSessionId::new(2));
            assert_eq!(state.chat_sessions[0].id, ChatSessionId::new(2));
        }

        #[test]
        fn failed_write_keeps_new_state_and_clears_persisted_flag() {
            let storage = InMemoryStateStorage::new();
            let store = store_over(&storage);
            storage.set_fail_writes(true);

            let state = store.dispatch(ChatAction::SetLoading(true));

            assert!(state.is_loading);
            assert!(store.get_state().is_loading);
            assert!(!store.is_persisted());

            storage.set_fail_writes(false);
            store.dispatch(ChatAction::SetLoading(false));
            assert!(store.is_persisted());
        }

        #[test]
        fn unknown_json_action_is_a_noop() {
            let storage = InMemoryStateStorage::new();
            let store = store_over(&storage);
            store.dispatch(ChatAction::SetInput("keep".into()));
            let before = store.get_state();
            let writes = storage.write_count();

            let after = store.dispatch_json(json!({"type": "launch-rockets", "payload": 1}));

            assert_eq!(*after, *before);
            assert_eq!(storage.write_count(), writes);
        }

        #[test]
        fn malformed_json_payload_is_a_noop() {
            let storage = InMemoryStateStorage::new();
            let store = store_over(&storage);

            let after = store.dispatch_json(json!({"type": "set-loading", "payload": "yes"}));

            assert_eq!(*after, ChatState::default());
        }

        #[test]
        fn json_action_is_decoded_and_applied() {
            let storage = InMemoryStateStorage::new();
            let store = store_over(&storage);

            store.dispatch_json(json!({"type": "toggle-bookmark", "payload": {"messageId": "m1"}}));

            assert!(store
                .get_state()
                .is_bookmarked(&MessageId::new("m1").unwrap()));
        }

        #[test]
        fn remove_error_messages_only_drops_system_errors() {
            let storage = InMemoryStateStorage::new();
            let store = store_over(&storage);
            store.dispatch(ChatAction::AddMessage(ChatMessage::new(
                MessageSender::System,
                "Error: timeout",
            )));
            store.dispatch(ChatAction::AddMessage(ChatMessage::new(
                MessageSender::User,
                "Error: not real",
            )));

            let state = store.dispatch(ChatAction::RemoveErrorMessages);

            assert_eq!(state.messages.len(), 1);
            assert_eq!(state.messages[0].sender, MessageSender::User);
        }

        #[test]
        fn deleting_a_duplicated_session_id_keeps_the_list() {
            let storage = InMemoryStateStorage::new();
            let store = ChatStore::load(
                Arc::new(storage.clone()),
                KEY,
                SessionDeletionPolicy::SelectFirstRemaining,
            );
            store.dispatch_json(json!({
                "type": "set-chat-sessions",
                "payload": [{"id": 1, "name": "a"}, {"id": 1, "name": "b"}]
            }));

            let state = store.dispatch_json(json!({"type": "delete-chat-session", "payload": 1}));

            assert_eq!(state.chat_sessions.len(), 2);
            assert_eq!(state.current_session_id, ChatSessionId::new(1));
        }

        #[test]
        fn reset_state_ignores_storage() {
            let storage = InMemoryStateStorage::new();
            let store = store_over(&storage);
            store.dispatch(ChatAction::ToggleBookmark(Bookmark::new(
                MessageId::new("m1").unwrap(),
                0.0,
            )));

            let state = store.dispatch(ChatAction::ResetState);

            assert_eq!(*state, ChatState::default());
            let blob = storage.blob(KEY).unwrap();
            assert_eq!(serde_json::from_str::<ChatState>(&blob).unwrap(), ChatState::default());
        }
    }

    mod listeners {
        use super::*;

        #[test]
        fn unsubscribed_listener_is_not_called() {
            let storage = InMemoryStateStorage::new();
            let store = store_over(&storage);
            let calls = Arc::new(AtomicUsize::new(0));
            let counter = calls.clone();
            let id = store.subscribe(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            });

            store.dispatch(ChatAction::SetFullscreen(true));
            assert!(store.unsubscribe(id));
            store.dispatch(ChatAction::SetFullscreen(false));

            assert_eq!(calls.load(Ordering::SeqCst), 1);
            assert!(!store.unsubscribe(id));
        }

        #[test]
        fn panicking_listener_does_not_block_others() {
            let storage = InMemoryStateStorage::new();
            let store = store_over(&storage);
            let calls = Arc::new(AtomicUsize::new(0));
            let counter = calls.clone();
            store.subscribe(|_| panic!("listener bug"));
            store.subscribe(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            });

            store.dispatch(ChatAction::SetScrollTop(true));

            assert_eq!(calls.load(Ordering::SeqCst), 1);
        }

        #[test]
        fn listener_may_read_store_during_notification() {
            let storage = InMemoryStateStorage::new();
            let store = Arc::new(store_over(&storage));
            let seen = Arc::new(Mutex::new(String::new()));

            let weak = Arc::downgrade(&store);
            let slot = seen.clone();
            store.subscribe(move |_| {
                if let Some(store) = weak.upgrade() {
                    *slot.lock().unwrap() = store.get_state().input.clone();
                }
            });

            store.dispatch(ChatAction::SetInput("reentrant".into()));

            assert_eq!(*seen.lock().unwrap(), "reentrant");
        }

        #[test]
        fn concurrent_dispatches_notify_in_storage_order() {
            const WRITERS: usize = 8;
            const ROUNDS: usize = 25;

            let storage = InMemoryStateStorage::new();
            let store = Arc::new(store_over(&storage));
            let notified = Arc::new(Mutex::new(Vec::new()));

            let reader = storage.clone();
            let log = notified.clone();
            store.subscribe(move |state| {
                let stored: ChatState =
                    serde_json::from_str(&reader.blob(KEY).unwrap()).unwrap();
                assert_eq!(stored.input, state.input);
                log.lock().unwrap().push(state.input.clone());
            });

            let handles: Vec<_> = (0..WRITERS)
                .map(|writer| {
                    let store = store.clone();
                    std::thread::spawn(move || {
                        for round in 0..ROUNDS {
                            store.dispatch(ChatAction::SetInput(format!("{writer}-{round}")));
                        }
                    })
                })
                .collect();
            for handle in handles {
                handle.join().unwrap();
            }

            let notified = notified.lock().unwrap();
            assert_eq!(notified.len(), WRITERS * ROUNDS);
            assert_eq!(notified.last(), Some(&store.get_state().input));
            for writer in 0..WRITERS {
                let rounds: Vec<usize> = notified
                    .iter()
                    .filter_map(|input| input.split_once('-'))
                    .filter(|(w, _)| *w == writer.to_string())
                    .map(|(_, r)| r.parse().unwrap())
                    .collect();
                assert_eq!(rounds, (0..ROUNDS).collect::<Vec<_>>());
            }
        }
    }
}
