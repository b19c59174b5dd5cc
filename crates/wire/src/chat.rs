//! Chat wire models and translation helpers.
//!
//! Responsibilities:
//! - Define the normalised [`Identity`] and [`Conversation`] shapes
//! - Provide one adapter per chat collaborator call (single conversation, conversation list,
//!   send acknowledgement)
//! - Define the request bodies for sending messages
//!
//! Notes:
//! - Participants arrive as a profile object or as a bare identity key
//! - `getConversationById` may omit the conversation id; the requested id is used instead

use crate::payload::{self, non_blank, WireId, WireProfile};
use crate::{WireError, WireResult};
use campus_types::{NonEmptyText, UserKey};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Public domain-level types
// ============================================================================

/// A platform user as seen from a chat.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    /// Stable identity key. Identity comparisons use this key only.
    pub key: UserKey,
    pub name: Option<NonEmptyText>,
    pub picture_url: Option<String>,
}

impl Identity {
    /// Creates an identity known only by its key.
    pub fn new(key: UserKey) -> Self {
        Self {
            key,
            name: None,
            picture_url: None,
        }
    }

    /// Returns `true` if this identity has the given key.
    pub fn is(&self, key: &UserKey) -> bool {
        self.key == *key
    }

    /// Display name, falling back to the identity key.
    pub fn display_name(&self) -> &str {
        self.name
            .as_ref()
            .map(NonEmptyText::as_str)
            .unwrap_or_else(|| self.key.as_str())
    }
}

/// A two-party conversation. Symmetric: neither participant is privileged.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Conversation {
    pub id: String,
    pub participant_a: Identity,
    pub participant_b: Identity,
}

impl Conversation {
    /// Returns `true` if either participant has the given key.
    pub fn involves(&self, key: &UserKey) -> bool {
        self.participant_a.is(key) || self.participant_b.is(key)
    }

    /// The participant that is not `viewer`.
    ///
    /// Falls back to `participant_a` when the viewer is unknown or not part of the
    /// conversation.
    pub fn counterpart(&self, viewer: Option<&UserKey>) -> &Identity {
        match viewer {
            Some(viewer) if self.participant_a.is(viewer) => &self.participant_b,
            Some(viewer) if self.participant_b.is(viewer) => &self.participant_a,
            _ => &self.participant_a,
        }
    }

    /// The participant that is not `viewer`, only when `viewer` takes part in the
    /// conversation with someone else.
    pub fn other_participant(&self, viewer: &UserKey) -> Option<&Identity> {
        let (a, b) = (&self.participant_a, &self.participant_b);
        match (a.is(viewer), b.is(viewer)) {
            (true, false) => Some(b),
            (false, true) => Some(a),
            _ => None,
        }
    }
}

/// Acknowledgement of a sent message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentMessage {
    /// Conversation the message landed in. For a first message this is the newly assigned id.
    pub conversation_id: String,
    pub message_id: Option<String>,
}

/// Body of the "send first message" request.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FirstMessageRequest<'a> {
    pub counterpart: &'a UserKey,
    pub message: &'a NonEmptyText,
}

/// Body of the "send message to an existing conversation" request.
#[derive(Clone, Debug, Serialize)]
pub struct MessageRequest<'a> {
    pub message: &'a NonEmptyText,
}

// ============================================================================
// Public Chats operations
// ============================================================================

/// Chat payload operations.
///
/// This is a zero-sized type used for namespacing chat-related adapters.
pub struct Chats;

impl Chats {
    /// Adapter for the `getConversationById` collaborator call.
    ///
    /// `requested_id` is used when the payload does not carry the conversation id.
    ///
    /// # Errors
    ///
    /// Returns [`WireError`] if the payload is not a conversation or a participant key is
    /// invalid.
    pub fn conversation_parse(json_text: &str, requested_id: &str) -> WireResult<Conversation> {
        let payload = payload::open(json_text)?;
        let payload = match payload {
            Value::Object(mut map) if map.contains_key("chat") => {
                payload::unwrap_payload(map.remove("chat").unwrap_or(Value::Null))?
            }
            other => other,
        };

        let wire: WireConversation = payload::decode(payload, "conversation")?;
        let fallback = WireId::Text(requested_id.to_string());
        conversation_to_domain(wire, Some(fallback), "conversation")
    }

    /// Adapter for the `listConversations` collaborator call.
    ///
    /// Accepts a bare array or an object holding the array under `chats` or `conversations`.
    ///
    /// # Errors
    ///
    /// Returns [`WireError`] if any entry is malformed or lacks an id.
    pub fn conversations_parse(json_text: &str) -> WireResult<Vec<Conversation>> {
        let payload = payload::open(json_text)?;
        let list = match payload {
            Value::Array(_) => payload,
            Value::Object(mut map) => payload::take_first(&mut map, &["chats", "conversations"])
                .ok_or_else(|| WireError::MissingField("chats".into()))?,
            _ => {
                return Err(WireError::InvalidInput(
                    "conversation list must be an array or an object".into(),
                ))
            }
        };

        let wire: Vec<WireConversation> = payload::decode(list, "conversations")?;
        wire.into_iter()
            .enumerate()
            .map(|(idx, conversation)| {
                conversation_to_domain(conversation, None, &format!("conversations[{idx}]"))
            })
            .collect()
    }

    /// Adapter for the `sendFirstMessage` and `sendMessage` collaborator calls.
    ///
    /// `known_conversation` is used when the acknowledgement omits the conversation id, which
    /// is only acceptable when sending into an existing conversation.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::MissingField`] when no conversation id can be determined.
    pub fn sent_message_parse(
        json_text: &str,
        known_conversation: Option<&str>,
    ) -> WireResult<SentMessage> {
        let payload = payload::open(json_text)?;
        let wire: WireSent = payload::decode(payload, "sent message")?;

        let conversation_id = wire
            .conversation_id
            .and_then(WireId::into_non_blank)
            .or_else(|| known_conversation.map(str::to_string))
            .ok_or_else(|| WireError::MissingField("chatId".into()))?;

        Ok(SentMessage {
            conversation_id,
            message_id: wire
                .message_id
                .and_then(WireId::into_non_blank)
                .or_else(|| wire.id.and_then(WireId::into_non_blank)),
        })
    }
}

// ============================================================================
// Wire types (internal)
// ============================================================================

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireConversation {
    #[serde(default, alias = "chatId", alias = "chat_id")]
    id: Option<WireId>,
    #[serde(alias = "participant_a", alias = "user1", alias = "sender")]
    participant_a: WireParticipant,
    #[serde(alias = "participant_b", alias = "user2", alias = "receiver")]
    participant_b: WireParticipant,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
enum WireParticipant {
    Key(WireId),
    Profile(WireProfile),
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireSent {
    #[serde(default, alias = "chatId", alias = "chat_id", alias = "conversation_id")]
    conversation_id: Option<WireId>,
    #[serde(default, alias = "message_id")]
    message_id: Option<WireId>,
    /// Some endpoints answer with the created message itself, whose `id` is the message id.
    #[serde(default)]
    id: Option<WireId>,
}

// ============================================================================
// Helper functions (internal)
// ============================================================================

fn participant_to_domain(wire: WireParticipant, field: &str) -> WireResult<Identity> {
    match wire {
        WireParticipant::Key(key) => Ok(Identity::new(key.into_user_key(field)?)),
        WireParticipant::Profile(profile) => Ok(Identity {
            key: profile.ci.into_user_key(&format!("{field}.ci"))?,
            name: non_blank(profile.name).and_then(|n| NonEmptyText::new(n).ok()),
            picture_url: non_blank(profile.picture),
        }),
    }
}

fn conversation_to_domain(
    wire: WireConversation,
    fallback_id: Option<WireId>,
    context: &str,
) -> WireResult<Conversation> {
    let id = wire
        .id
        .and_then(WireId::into_non_blank)
        .or_else(|| fallback_id.and_then(WireId::into_non_blank))
        .ok_or_else(|| WireError::MissingField(format!("{context}.id")))?;

    Ok(Conversation {
        id,
        participant_a: participant_to_domain(
            wire.participant_a,
            &format!("{context}.participantA"),
        )?,
        participant_b: participant_to_domain(
            wire.participant_b,
            &format!("{context}.participantB"),
        )?,
    })
}
