//! Pure reducer for the chat store.

use serde::Deserialize;

use super::action::ChatAction;
use super::state::{ChatSession, ChatState};

/// What happens to `current_session_id` when its session disappears.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionDeletionPolicy {
    /// Leave the id dangling; the caller follows up with `set-current-session`.
    #[default]
    CallerReassigns,
    /// Point at the first remaining session.
    SelectFirstRemaining,
}

/// Computes the next snapshot. `state` is never modified.
pub fn reduce(state: &ChatState, action: ChatAction, policy: SessionDeletionPolicy) -> ChatState {
    let mut next = state.clone();

    match action {
        ChatAction::SetMessages(messages) => next.messages = messages,
        ChatAction::AddMessage(message) => next.messages.push(message),
        ChatAction::SetChatSessions(sessions) => {
            next.chat_sessions = if sessions.is_empty() {
                vec![ChatSession::default_session()]
            } else {
                sessions
            };
            reassign_if_dangling(&mut next, policy);
        }
        ChatAction::AddChatSession(session) => {
            next.chat_sessions.retain(|s| s.id != session.id);
            next.current_session_id = session.id;
            next.chat_sessions.insert(0, session);
        }
        ChatAction::DeleteChatSession(id) => {
            let remaining: Vec<ChatSession> = next
                .chat_sessions
                .iter()
                .filter(|s| s.id != id)
                .cloned()
                .collect();
            // Refused when nothing would remain, duplicates of `id` included.
            if !remaining.is_empty() {
                next.chat_sessions = remaining;
                reassign_if_dangling(&mut next, policy);
            }
        }
        ChatAction::SetCurrentSession(id) => {
            if next.has_session(id) {
                next.current_session_id = id;
            }
        }
        ChatAction::SetInput(input) => next.input = input,
        ChatAction::SetLoading(flag) => next.is_loading = flag,
        ChatAction::SetFullscreen(flag) => next.is_fullscreen = flag,
        ChatAction::SetHelpDialog(flag) => next.is_help_dialog_open = flag,
        ChatAction::SetPromptHelp(flag) => next.is_prompt_help_open = flag,
        ChatAction::SetScrollTop(flag) => next.show_scroll_top = flag,
        ChatAction::SetScrollBottom(flag) => next.show_scroll_bottom = flag,
        ChatAction::ResetState => next = ChatState::default(),
        ChatAction::ToggleBookmark(bookmark) => {
            let before = next.bookmarked_messages.len();
            next.bookmarked_messages
                .retain(|b| b.message_id != bookmark.message_id);
            if next.bookmarked_messages.len() == before {
                next.bookmarked_messages.push(bookmark);
            }
        }
        ChatAction::UpdateBookmarkPositions(positions) => {
            for bookmark in &mut next.bookmarked_messages {
                if let Some(position) = positions.get(&bookmark.message_id) {
                    bookmark.position = *position;
                }
            }
        }
        ChatAction::RemoveErrorMessages => next.messages.retain(|m| !m.is_error_notice()),
    }

    next
}

fn reassign_if_dangling(state: &mut ChatState, policy: SessionDeletionPolicy) {
    if policy != SessionDeletionPolicy::SelectFirstRemaining
        || state.has_session(state.current_session_id)
    {
        return;
    }
    if let Some(first) = state.chat_sessions.first() {
        state.current_session_id = first.id;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::chat::state::{Bookmark, ChatMessage, MessageSender};
    use crate::domain::foundation::{ChatSessionId, MessageId};
    use proptest::prelude::*;
    use std::collections::HashMap;

    fn mid(s: &str) -> MessageId {
        MessageId::new(s).unwrap()
    }

    fn sid(n: u64) -> ChatSessionId {
        ChatSessionId::new(n)
    }

    fn apply(state: &ChatState, action: ChatAction) -> ChatState {
        reduce(state, action, SessionDeletionPolicy::CallerReassigns)
    }

    fn three_sessions() -> ChatState {
        let mut state = ChatState::default();
        state = apply(&state, ChatAction::AddChatSession(ChatSession::new(sid(2), "Two")));
        apply(&state, ChatAction::AddChatSession(ChatSession::new(sid(3), "Three")))
    }

    mod sessions {
        use super::*;

        #[test]
        fn add_chat_session_prepends_and_selects() {
            let state = apply(
                &ChatState::default(),
                ChatAction::AddChatSession(ChatSession::new(sid(2), "X")),
            );
            assert_eq!(state.current_session_id, sid(2));
            assert_eq!(state.chat_sessions[0], ChatSession::new(sid(2), "X"));
            assert_eq!(state.chat_sessions.len(), 2);
        }

        #[test]
        fn add_chat_session_with_existing_id_moves_it_to_front() {
            let state = three_sessions();
            let state = apply(&state, ChatAction::AddChatSession(ChatSession::new(sid(2), "Renamed")));
            let ids: Vec<u64> = state.chat_sessions.iter().map(|s| s.id.value()).collect();
            assert_eq!(ids, vec![2, 3, 1]);
            assert_eq!(state.chat_sessions[0].name, "Renamed");
        }

        #[test]
        fn delete_current_session_leaves_id_dangling_by_default() {
            let state = three_sessions();
            let state = apply(&state, ChatAction::DeleteChatSession(sid(3)));
            assert!(!state.has_session(sid(3)));
            assert_eq!(state.current_session_id, sid(3));
            assert!(state.current_session().is_none());
        }

        #[test]
        fn delete_current_session_can_select_first_remaining() {
            let state = three_sessions();
            let state = reduce(
                &state,
                ChatAction::DeleteChatSession(sid(3)),
                SessionDeletionPolicy::SelectFirstRemaining,
            );
            assert_eq!(state.current_session_id, sid(2));
        }

        #[test]
        fn delete_last_session_is_refused() {
            let state = ChatState::default();
            let next = apply(&state, ChatAction::DeleteChatSession(state.current_session_id));
            assert_eq!(next, state);
        }

        #[test]
        fn set_chat_sessions_never_leaves_list_empty() {
            let state = apply(&three_sessions(), ChatAction::SetChatSessions(vec![]));
            assert_eq!(state.chat_sessions, vec![ChatSession::default_session()]);
        }

        #[test]
        fn delete_refused_when_only_duplicates_of_id_remain() {
            let duplicated = vec![ChatSession::new(sid(1), "a"), ChatSession::new(sid(1), "b")];
            for policy in [
                SessionDeletionPolicy::CallerReassigns,
                SessionDeletionPolicy::SelectFirstRemaining,
            ] {
                let state = reduce(
                    &ChatState::default(),
                    ChatAction::SetChatSessions(duplicated.clone()),
                    policy,
                );
                let next = reduce(&state, ChatAction::DeleteChatSession(sid(1)), policy);
                assert_eq!(next.chat_sessions, duplicated);
            }
        }

        #[test]
        fn set_current_session_ignores_unknown_ids() {
            let state = three_sessions();
            let next = apply(&state, ChatAction::SetCurrentSession(sid(42)));
            assert_eq!(next.current_session_id, sid(3));
            let next = apply(&state, ChatAction::SetCurrentSession(sid(1)));
            assert_eq!(next.current_session_id, sid(1));
        }
    }

    mod messages {
        use super::*;

        #[test]
        fn add_message_appends_in_order() {
            let first = ChatMessage::with_id(mid("a"), MessageSender::User, "hi");
            let second = ChatMessage::with_id(mid("b"), MessageSender::Assistant, "hello");
            let state = apply(&ChatState::default(), ChatAction::AddMessage(first.clone()));
            let state = apply(&state, ChatAction::AddMessage(second.clone()));
            assert_eq!(state.messages, vec![first, second]);
        }

        #[test]
        fn remove_error_messages_only_drops_system_errors() {
            let system = ChatMessage::with_id(mid("a"), MessageSender::System, "Error: timeout");
            let user = ChatMessage::with_id(mid("b"), MessageSender::User, "Error: not real");
            let state = apply(
                &ChatState::default(),
                ChatAction::SetMessages(vec![system, user.clone()]),
            );
            let state = apply(&state, ChatAction::RemoveErrorMessages);
            assert_eq!(state.messages, vec![user]);
        }
    }

    mod flags {
        use super::*;

        #[test]
        fn flag_actions_set_their_field() {
            let mut state = ChatState::default();
            for action in [
                ChatAction::SetLoading(true),
                ChatAction::SetFullscreen(true),
                ChatAction::SetHelpDialog(true),
                ChatAction::SetPromptHelp(true),
                ChatAction::SetScrollTop(true),
                ChatAction::SetScrollBottom(true),
                ChatAction::SetInput("draft".into()),
            ] {
                state = apply(&state, action);
            }
            assert!(state.is_loading);
            assert!(state.is_fullscreen);
            assert!(state.is_help_dialog_open);
            assert!(state.is_prompt_help_open);
            assert!(state.show_scroll_top);
            assert!(state.show_scroll_bottom);
            assert_eq!(state.input, "draft");
        }

        #[test]
        fn reset_state_returns_default() {
            let state = apply(&three_sessions(), ChatAction::SetLoading(true));
            assert_eq!(apply(&state, ChatAction::ResetState), ChatState::default());
        }
    }

    mod bookmarks {
        use super::*;

        #[test]
        fn toggle_adds_then_removes() {
            let state = apply(
                &ChatState::default(),
                ChatAction::ToggleBookmark(Bookmark::new(mid("m1"), 5.0)),
            );
            assert!(state.is_bookmarked(&mid("m1")));
            let state = apply(&state, ChatAction::ToggleBookmark(Bookmark::new(mid("m1"), 99.0)));
            assert!(!state.is_bookmarked(&mid("m1")));
        }

        #[test]
        fn update_positions_touches_only_mapped_bookmarks() {
            let mut state = ChatState::default();
            state = apply(&state, ChatAction::ToggleBookmark(Bookmark::new(mid("m1"), 1.0)));
            state = apply(&state, ChatAction::ToggleBookmark(Bookmark::new(mid("m2"), 2.0)));

            let mut positions = HashMap::new();
            positions.insert(mid("m2"), 250.0);
            positions.insert(mid("ghost"), 7.0);
            let state = apply(&state, ChatAction::UpdateBookmarkPositions(positions));

            assert_eq!(state.bookmarked_messages.len(), 2);
            assert_eq!(state.bookmarked_messages[0].position, 1.0);
            assert_eq!(state.bookmarked_messages[1].position, 250.0);
        }
    }

    fn bookmark_strategy() -> impl Strategy<Value = Bookmark> {
        ("[a-e]", 0u32..1000).prop_map(|(id, pos)| Bookmark::new(mid(&id), pos as f64))
    }

    proptest! {
        #[test]
        fn toggle_twice_restores_bookmarks(
            seed in prop::collection::vec(bookmark_strategy(), 0..8),
            target in bookmark_strategy(),
        ) {
            let mut state = ChatState::default();
            for b in seed {
                state = apply(&state, ChatAction::ToggleBookmark(b));
            }
            let once = apply(&state, ChatAction::ToggleBookmark(target.clone()));
            let twice = apply(&once, ChatAction::ToggleBookmark(target.clone()));

            let ids = |s: &ChatState| s.bookmarked_messages.iter().map(|b| b.message_id.clone()).collect::<Vec<_>>();
            let mut before = ids(&state);
            let mut after = ids(&twice);
            before.sort();
            after.sort();
            prop_assert_eq!(before, after);
        }

        #[test]
        fn bookmarks_stay_unique(toggles in prop::collection::vec(bookmark_strategy(), 0..32)) {
            let mut state = ChatState::default();
            for b in toggles {
                state = apply(&state, ChatAction::ToggleBookmark(b));
            }
            let mut ids: Vec<_> = state.bookmarked_messages.iter().map(|b| b.message_id.clone()).collect();
            let total = ids.len();
            ids.sort();
            ids.dedup();
            prop_assert_eq!(ids.len(), total);
        }

        #[test]
        fn session_list_is_never_empty(
            ops in prop::collection::vec((0u8..4, 1u64..5), 0..32),
            select_first in any::<bool>(),
        ) {
            let policy = if select_first {
                SessionDeletionPolicy::SelectFirstRemaining
            } else {
                SessionDeletionPolicy::CallerReassigns
            };
            let mut state = ChatState::default();
            for (op, id) in ops {
                let action = match op {
                    0 => ChatAction::AddChatSession(ChatSession::new(sid(id), format!("S{}", id))),
                    1 => ChatAction::DeleteChatSession(sid(id)),
                    2 => ChatAction::SetChatSessions(vec![
                        ChatSession::new(sid(id), "first"),
                        ChatSession::new(sid(id), "copy"),
                    ]),
                    _ => ChatAction::SetChatSessions(vec![]),
                };
                state = reduce(&state, action, policy);
                prop_assert!(!state.chat_sessions.is_empty());
            }
        }
    }
}
