//! Error taxonomy shared across the bot, dispatcher and transport layers.

use std::sync::Arc;

use thiserror::Error;

use crate::context::Context;

/// All the ways an API call or dispatch step can fail.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The platform rejected the request with an error code and description.
    #[error("telegram: {description} ({code})")]
    Telegram { code: i32, description: String },

    /// Rate limited. Retry after the indicated number of seconds.
    #[error("telegram: retry after {retry_after}s")]
    Flood { retry_after: u64 },

    /// The group was migrated to a supergroup; resend to the new chat id.
    #[error("telegram: group migrated to {migrated_to}")]
    Group { migrated_to: i64 },

    /// The request never produced a well-formed response.
    #[error("transport: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The response body could not be decoded.
    #[error("decode: {0}")]
    Decode(#[from] serde_json::Error),

    /// The call was addressed to nothing.
    #[error("recipient is nil")]
    BadRecipient,

    /// The value cannot be sent through this call.
    #[error("unsupported what argument")]
    Unsupported,

    /// The context does not carry the object this operation needs.
    #[error("context does not carry a {0}")]
    BadContext(&'static str),

    /// The platform answered with a bare `true` where an object was
    /// expected. Not a failure, but the caller gets no message back.
    #[error("result is True")]
    TrueResult,

    /// A handler-level failure with no finer classification.
    #[error("{0}")]
    Other(String),
}

impl ApiError {
    /// Wraps any displayable error as [`ApiError::Other`].
    pub fn other(err: impl std::fmt::Display) -> Self {
        ApiError::Other(err.to_string())
    }

    /// Wraps a transport-level failure.
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        ApiError::Transport(Box::new(err))
    }

    /// True if retrying the same request later can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::Flood { .. } | ApiError::Transport(_))
    }

    fn description_contains(&self, needle: &str) -> bool {
        match self {
            ApiError::Telegram { description, .. } => {
                description.to_ascii_lowercase().contains(needle)
            }
            _ => false,
        }
    }

    /// The edit changed nothing; clients surface this as error 400.
    pub fn is_message_not_modified(&self) -> bool {
        self.description_contains("message is not modified")
    }

    /// The recipient blocked the bot.
    pub fn is_blocked_by_user(&self) -> bool {
        self.description_contains("bot was blocked by the user")
    }

    /// The addressed chat does not exist or the bot was never in it.
    pub fn is_chat_not_found(&self) -> bool {
        self.description_contains("chat not found")
    }
}

/// Receives every error produced by handlers and middleware.
///
/// The dispatcher never propagates handler errors to the caller; they are
/// sunk here, together with the context that produced them when one exists.
pub type ErrorSink = Arc<dyn Fn(&ApiError, Option<&Context>) + Send + Sync>;

/// The default sink logs the error at error level and moves on.
pub fn default_error_sink() -> ErrorSink {
    Arc::new(|err, _ctx| {
        tracing::error!(error = %err, "handler error");
    })
}
