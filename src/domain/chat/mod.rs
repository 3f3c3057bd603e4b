//! Chat module - session state, actions and the reducer behind the
//! persisted chat store.

mod action;
mod reducer;
mod state;

pub use action::ChatAction;
pub use reducer::{reduce, SessionDeletionPolicy};
pub use state::{
    Bookmark, ChatMessage, ChatSession, ChatState, MessageSender, DEFAULT_SESSION_ID,
    DEFAULT_SESSION_NAME, ERROR_MARKER,
};
