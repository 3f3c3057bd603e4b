//! Chat session state held by the persisted store.
//!
//! The whole struct is serialized as one JSON blob, so field names follow
//! the camelCase shape the UI reads and writes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;

use crate::domain::foundation::{ChatSessionId, MessageId, Timestamp};

/// Id of the session that always exists in a fresh state.
pub const DEFAULT_SESSION_ID: ChatSessionId = ChatSessionId::new(1);

/// Display name of the default session.
pub const DEFAULT_SESSION_NAME: &str = "Default Chat";

/// Marker that identifies a transient error notice in a system message.
pub const ERROR_MARKER: &str = "Error:";

/// Author of a transcript message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageSender {
    /// Person typing in the chat box.
    User,
    /// Assistant reply.
    Assistant,
    /// Notices produced by the client itself (errors, status).
    System,
    /// Any sender name this client does not know, kept verbatim.
    #[serde(untagged)]
    Other(String),
}

/// One message in the chat transcript.
///
/// Fields this struct does not model are kept in `extra` and written back
/// unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: MessageId,
    pub sender: MessageSender,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Timestamp>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChatMessage {
    /// Creates a message with a generated id stamped with the current time.
    pub fn new(sender: MessageSender, text: impl Into<String>) -> Self {
        Self {
            id: MessageId::generate(),
            sender,
            text: text.into(),
            timestamp: Some(Timestamp::now()),
            extra: Map::new(),
        }
    }

    /// Creates a message with a caller-chosen id and no timestamp.
    pub fn with_id(id: MessageId, sender: MessageSender, text: impl Into<String>) -> Self {
        Self {
            id,
            sender,
            text: text.into(),
            timestamp: None,
            extra: Map::new(),
        }
    }

    /// Returns true for system notices that carry an error marker.
    pub fn is_error_notice(&self) -> bool {
        self.sender == MessageSender::System && self.text.contains(ERROR_MARKER)
    }
}

/// Entry in the session sidebar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: ChatSessionId,
    pub name: String,
}

impl ChatSession {
    pub fn new(id: ChatSessionId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    /// The session every state falls back to.
    pub fn default_session() -> Self {
        Self::new(DEFAULT_SESSION_ID, DEFAULT_SESSION_NAME)
    }
}

/// A message marked by the user, with its last known scroll position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    pub message_id: MessageId,
    #[serde(default)]
    pub position: f64,
}

impl Bookmark {
    pub fn new(message_id: MessageId, position: f64) -> Self {
        Self {
            message_id,
            position,
        }
    }
}

/// Full snapshot of the chat UI state.
///
/// # Invariants
///
/// - `chat_sessions` is never empty
/// - `bookmarked_messages` holds at most one entry per message id
/// - `current_session_id` names an entry of `chat_sessions`, except right
///   after a deletion under `SessionDeletionPolicy::CallerReassigns`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatState {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,

    #[serde(default)]
    pub chat_sessions: Vec<ChatSession>,

    #[serde(default = "default_current_session_id")]
    pub current_session_id: ChatSessionId,

    #[serde(default)]
    pub input: String,

    #[serde(default)]
    pub is_loading: bool,

    #[serde(default)]
    pub is_fullscreen: bool,

    #[serde(default)]
    pub is_help_dialog_open: bool,

    #[serde(default)]
    pub is_prompt_help_open: bool,

    #[serde(default)]
    pub show_scroll_top: bool,

    #[serde(default)]
    pub show_scroll_bottom: bool,

    #[serde(default)]
    pub bookmarked_messages: Vec<Bookmark>,
}

fn default_current_session_id() -> ChatSessionId {
    DEFAULT_SESSION_ID
}

impl Default for ChatState {
    fn default() -> Self {
        Self {
            messages: Vec::new(),
            chat_sessions: vec![ChatSession::default_session()],
            current_session_id: DEFAULT_SESSION_ID,
            input: String::new(),
            is_loading: false,
            is_fullscreen: false,
            is_help_dialog_open: false,
            is_prompt_help_open: false,
            show_scroll_top: false,
            show_scroll_bottom: false,
            bookmarked_messages: Vec::new(),
        }
    }
}

impl ChatState {
    /// Returns the session `current_session_id` points at, if it exists.
    pub fn current_session(&self) -> Option<&ChatSession> {
        self.chat_sessions
            .iter()
            .find(|s| s.id == self.current_session_id)
    }

    /// Returns true if a session with this id exists.
    pub fn has_session(&self, id: ChatSessionId) -> bool {
        self.chat_sessions.iter().any(|s| s.id == id)
    }

    /// Returns true if the message is bookmarked.
    pub fn is_bookmarked(&self, message_id: &MessageId) -> bool {
        self.bookmarked_messages
            .iter()
            .any(|b| &b.message_id == message_id)
    }

    /// Repairs a snapshot read from storage so it satisfies the invariants.
    ///
    /// Returns true if anything had to change.
    pub fn normalize(&mut self) -> bool {
        let mut changed = false;

        if self.chat_sessions.is_empty() {
            self.chat_sessions.push(ChatSession::default_session());
            changed = true;
        }

        let mut seen = HashSet::new();
        let before = self.bookmarked_messages.len();
        self.bookmarked_messages
            .retain(|b| seen.insert(b.message_id.clone()));
        changed |= self.bookmarked_messages.len() != before;

        if !self.has_session(self.current_session_id) {
            if let Some(first) = self.chat_sessions.first() {
                self.current_session_id = first.id;
                changed = true;
            }
        }

        changed
    }
}
