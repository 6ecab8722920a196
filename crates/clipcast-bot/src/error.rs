//! Bot error types.

use thiserror::Error;

/// Result type for bot operations.
pub type BotResult<T> = Result<T, BotError>;

/// Errors from the Telegram Bot API.
#[derive(Debug, Error)]
pub enum BotError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Bot API error {code}: {description}")]
    Api { code: u16, description: String },

    #[error("Rate limited, retry after {0}s")]
    RateLimited(u64),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BotError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Classify a failed Bot API call.
    pub fn from_api_error(code: u16, description: impl Into<String>, retry_after: Option<u64>) -> Self {
        let description = description.into();
        match code {
            401 | 403 => Self::Unauthorized(description),
            429 => Self::RateLimited(retry_after.unwrap_or(5)),
            _ => Self::Api { code, description },
        }
    }

    /// Check if error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            BotError::Network(_) | BotError::RateLimited(_) => true,
            BotError::Api { code, .. } => *code >= 500,
            _ => false,
        }
    }
}
