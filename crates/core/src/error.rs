use crate::api::ApiError;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("cannot resolve counterpart for chat {chat_id}: {reason}")]
    CannotResolveCounterpart { chat_id: String, reason: String },

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl CoreError {
    /// Returns `true` when the caller may retry or fall back. Only configuration and input
    /// errors are permanent.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::CannotResolveCounterpart { .. } | Self::Api(_))
    }
}

impl From<campus_types::TextError> for CoreError {
    fn from(err: campus_types::TextError) -> Self {
        Self::InvalidInput(err.to_string())
    }
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;
