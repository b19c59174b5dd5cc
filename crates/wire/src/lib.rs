//! Wire boundary for the education platform API.
//!
//! This crate provides the **normalised record shapes** consumed by `campus-core` and the
//! **adapters** that turn raw API payloads into them:
//! - forum posts with their flat reply lists
//! - chat conversations and send-message acknowledgements
//!
//! The platform is inconsistent about payload shape. Depending on the endpoint a record may
//! arrive flat, nested under `data`, or wrapped in a `{ success, message, data }` result
//! envelope. Each collaborator call has exactly one adapter function here, so nothing
//! downstream ever sees that variability.

pub mod chat;
pub mod forum;
mod payload;

// Re-export facades
pub use chat::Chats;
pub use forum::Forum;

// Re-export public domain-level types
pub use chat::{Conversation, FirstMessageRequest, Identity, MessageRequest, SentMessage};
pub use forum::{PostRecord, PostThread, ReplyRecord};

pub use campus_types::{NonEmptyText, UserKey};

/// Errors returned by the `campus-wire` boundary crate.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("translation error: {0}")]
    Translation(String),

    #[error("request rejected by server: {message}")]
    Rejected { message: String },

    #[error("missing field: {0}")]
    MissingField(String),
}

/// Type alias for Results that can fail with a [`WireError`].
pub type WireResult<T> = Result<T, WireError>;
