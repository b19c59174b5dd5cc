//! Conversation resolution: reuse an existing conversation or start a new one.
//!
//! There is no explicit "create conversation" call on the platform. A conversation comes into
//! existence when the first message to a counterpart is sent, so opening a chat either finds
//! the existing conversation or yields a compose-first-message session keyed by counterpart.
//!
//! When several conversations already involve the counterpart, the one with the numerically
//! largest id is taken as the most recently created. This assumes ids are assigned in creation
//! order; a duplicate match is logged so a change in the id scheme is noticed.

use crate::api::PlatformApi;
use crate::error::CoreResult;
use campus_types::{NonEmptyText, UserKey};
use campus_wire::{Conversation, Identity, SentMessage};
use std::cmp::Ordering;

/// Returns the conversation with `counterpart`, if any.
///
/// With several matches the largest id wins (see [`compare_conversation_ids`]).
pub fn find_existing<'a>(
    conversations: &'a [Conversation],
    counterpart: &UserKey,
) -> Option<&'a Conversation> {
    let mut matches = conversations.iter().filter(|c| c.involves(counterpart));
    let first = matches.next()?;

    let mut duplicates = 0usize;
    let chosen = matches.fold(first, |best, candidate| {
        duplicates += 1;
        match compare_conversation_ids(&candidate.id, &best.id) {
            Ordering::Greater => candidate,
            _ => best,
        }
    });

    if duplicates > 0 {
        tracing::warn!(
            counterpart = %counterpart,
            matches = duplicates + 1,
            chosen = %chosen.id,
            "several conversations with the same counterpart, using the largest id"
        );
    }
    Some(chosen)
}

/// Total order on conversation ids.
///
/// Decimal ids compare numerically at any length (leading zeros ignored). A decimal id ranks
/// above a non-decimal one, and two non-decimal ids compare lexically.
pub fn compare_conversation_ids(a: &str, b: &str) -> Ordering {
    match (decimal_digits(a), decimal_digits(b)) {
        (Some(a), Some(b)) => a.len().cmp(&b.len()).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => a.cmp(b),
    }
}

/// Significant digits of a decimal id, or `None` if `id` is not all ASCII digits.
fn decimal_digits(id: &str) -> Option<&str> {
    if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let trimmed = id.trim_start_matches('0');
    Some(if trimmed.is_empty() { "0" } else { trimmed })
}

/// Where a chat screen stands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChatState {
    /// No conversation yet. Sending the first message creates it.
    New { counterpart: Identity },
    Existing {
        conversation_id: String,
        counterpart: Identity,
    },
}

impl ChatState {
    pub fn conversation_id(&self) -> Option<&str> {
        match self {
            Self::New { .. } => None,
            Self::Existing {
                conversation_id, ..
            } => Some(conversation_id),
        }
    }
}

/// An open chat with one counterpart.
#[derive(Debug)]
pub struct ChatSession<'a, A: ?Sized> {
    api: &'a A,
    state: ChatState,
}

impl<'a, A: PlatformApi + ?Sized> ChatSession<'a, A> {
    pub fn new(api: &'a A, state: ChatState) -> Self {
        Self { api, state }
    }

    pub fn state(&self) -> &ChatState {
        &self.state
    }

    /// Sends `text`.
    ///
    /// In the `New` state this sends the first message and moves to `Existing` using the
    /// conversation id from the acknowledgement, without re-fetching.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::Api`] if sending fails; the state is left unchanged.
    pub async fn send(&mut self, text: &NonEmptyText) -> CoreResult<SentMessage> {
        match &self.state {
            ChatState::New { counterpart } => {
                let sent = self.api.send_first_message(&counterpart.key, text).await?;
                tracing::info!(
                    counterpart = %counterpart.key,
                    conversation_id = %sent.conversation_id,
                    "started conversation"
                );
                self.state = ChatState::Existing {
                    conversation_id: sent.conversation_id.clone(),
                    counterpart: counterpart.clone(),
                };
                Ok(sent)
            }
            ChatState::Existing {
                conversation_id, ..
            } => Ok(self.api.send_message(conversation_id, text).await?),
        }
    }
}

/// Opens chats on behalf of a viewer.
#[derive(Clone, Debug)]
pub struct ConversationResolver<A> {
    api: A,
}

impl<A: PlatformApi> ConversationResolver<A> {
    pub fn new(api: A) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Fetches `viewer`'s conversations and looks for one with `counterpart`.
    ///
    /// A failed fetch is logged and treated as "no conversation yet", so the viewer can
    /// still start one.
    pub async fn find_for(&self, viewer: &UserKey, counterpart: &UserKey) -> Option<Conversation> {
        match self.api.list_conversations(viewer).await {
            Ok(conversations) => find_existing(&conversations, counterpart).cloned(),
            Err(e) => {
                tracing::warn!(
                    viewer = %viewer,
                    error = %e,
                    "conversation list unavailable, assuming no existing conversation"
                );
                None
            }
        }
    }

    /// Opens a chat with `counterpart`: the existing conversation when there is one, otherwise
    /// a new-conversation session. Nothing is sent.
    pub async fn open_chat(&self, viewer: &UserKey, counterpart: Identity) -> ChatSession<'_, A> {
        let state = match self.find_for(viewer, &counterpart.key).await {
            Some(conversation) => ChatState::Existing {
                conversation_id: conversation.id,
                counterpart,
            },
            None => ChatState::New { counterpart },
        };
        ChatSession::new(&self.api, state)
    }
}
