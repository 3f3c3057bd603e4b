//! Closed vocabulary of chat store actions.
//!
//! Actions travel as `{"type": "<kind>", "payload": ...}`; kinds are kebab-case.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::foundation::{ChatSessionId, MessageId};

use super::state::{Bookmark, ChatMessage, ChatSession};

/// Every transition the chat store understands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum ChatAction {
    /// Replace the transcript.
    SetMessages(Vec<ChatMessage>),
    /// Append one message to the transcript.
    AddMessage(ChatMessage),
    /// Replace the session list.
    SetChatSessions(Vec<ChatSession>),
    /// Prepend a session and make it current.
    AddChatSession(ChatSession),
    /// Remove a session by id.
    DeleteChatSession(ChatSessionId),
    SetCurrentSession(ChatSessionId),
    SetInput(String),
    SetLoading(bool),
    SetFullscreen(bool),
    SetHelpDialog(bool),
    SetPromptHelp(bool),
    SetScrollTop(bool),
    SetScrollBottom(bool),
    /// Back to the built-in default state (storage is not consulted).
    ResetState,
    /// Add the bookmark, or remove the existing one for the same message.
    ToggleBookmark(Bookmark),
    /// Move existing bookmarks to new positions.
    UpdateBookmarkPositions(HashMap<MessageId, f64>),
    /// Drop system notices that contain an error marker.
    RemoveErrorMessages,
}

impl ChatAction {
    /// Wire name of the action kind, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            ChatAction::SetMessages(_) => "set-messages",
            ChatAction::AddMessage(_) => "add-message",
            ChatAction::SetChatSessions(_) => "set-chat-sessions",
            ChatAction::AddChatSession(_) => "add-chat-session",
            ChatAction::DeleteChatSession(_) => "delete-chat-session",
            ChatAction::SetCurrentSession(_) => "set-current-session",
            ChatAction::SetInput(_) => "set-input",
            ChatAction::SetLoading(_) => "set-loading",
            ChatAction::SetFullscreen(_) => "set-fullscreen",
            ChatAction::SetHelpDialog(_) => "set-help-dialog",
            ChatAction::SetPromptHelp(_) => "set-prompt-help",
            ChatAction::SetScrollTop(_) => "set-scroll-top",
            ChatAction::SetScrollBottom(_) => "set-scroll-bottom",
            ChatAction::ResetState => "reset-state",
            ChatAction::ToggleBookmark(_) => "toggle-bookmark",
            ChatAction::UpdateBookmarkPositions(_) => "update-bookmark-positions",
            ChatAction::RemoveErrorMessages => "remove-error-messages",
        }
    }
}
