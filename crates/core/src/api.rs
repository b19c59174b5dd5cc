//! Collaborator interface to the remote platform API.
//!
//! The core never talks to the network directly. Each operation here corresponds to one
//! remote endpoint and returns normalised records from `campus-wire`; implementations are
//! expected to route every response through the matching `campus_wire` adapter.

use async_trait::async_trait;
use campus_types::{NonEmptyText, UserKey};
use campus_wire::{Conversation, PostThread, SentMessage, WireError};
use std::sync::Arc;

/// Failure of a single collaborator call. Always recoverable by the caller.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("invalid payload: {0}")]
    Payload(WireError),
}

impl From<WireError> for ApiError {
    fn from(err: WireError) -> Self {
        match err {
            WireError::Rejected { message } => Self::Rejected(message),
            other => Self::Payload(other),
        }
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Request/response operations of the platform API used by the core.
#[async_trait]
pub trait PlatformApi: Send + Sync {
    /// Fetches a single conversation by id.
    async fn get_conversation(&self, conversation_id: &str) -> ApiResult<Conversation>;

    /// Lists the conversations `viewer` takes part in.
    async fn list_conversations(&self, viewer: &UserKey) -> ApiResult<Vec<Conversation>>;

    /// Fetches a post with its flat reply list.
    async fn get_post(&self, post_id: &str) -> ApiResult<PostThread>;

    /// Sends the first message to `counterpart`, creating the conversation server-side.
    ///
    /// The acknowledgement carries the newly assigned conversation id.
    async fn send_first_message(
        &self,
        counterpart: &UserKey,
        text: &NonEmptyText,
    ) -> ApiResult<SentMessage>;

    /// Sends a message into an existing conversation.
    async fn send_message(
        &self,
        conversation_id: &str,
        text: &NonEmptyText,
    ) -> ApiResult<SentMessage>;
}

#[async_trait]
impl<T: PlatformApi + ?Sized> PlatformApi for Arc<T> {
    async fn get_conversation(&self, conversation_id: &str) -> ApiResult<Conversation> {
        (**self).get_conversation(conversation_id).await
    }

    async fn list_conversations(&self, viewer: &UserKey) -> ApiResult<Vec<Conversation>> {
        (**self).list_conversations(viewer).await
    }

    async fn get_post(&self, post_id: &str) -> ApiResult<PostThread> {
        (**self).get_post(post_id).await
    }

    async fn send_first_message(
        &self,
        counterpart: &UserKey,
        text: &NonEmptyText,
    ) -> ApiResult<SentMessage> {
        (**self).send_first_message(counterpart, text).await
    }

    async fn send_message(
        &self,
        conversation_id: &str,
        text: &NonEmptyText,
    ) -> ApiResult<SentMessage> {
        (**self).send_message(conversation_id, text).await
    }
}
