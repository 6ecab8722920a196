//! YouTube client error types.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for YouTube operations.
pub type YoutubeResult<T> = Result<T, YoutubeError>;

/// Errors that can occur while publishing a video.
#[derive(Debug, Error)]
pub enum YoutubeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication failed: {0}")]
    AuthError(String),

    /// The access token was rejected (HTTP 401); a fresh token may succeed.
    #[error("Access token rejected: {0}")]
    TokenRejected(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Server error {0}: {1}")]
    ServerError(u16, String),

    #[error("Rate limited, retry after {0}ms")]
    RateLimited(u64),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Upload session expired: {0}")]
    SessionExpired(String),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl YoutubeError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn auth_error(msg: impl Into<String>) -> Self {
        Self::AuthError(msg.into())
    }

    pub fn request_failed(msg: impl Into<String>) -> Self {
        Self::RequestFailed(msg.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Classify a non-success HTTP status.
    pub fn from_http_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 => Self::TokenRejected(message),
            403 => Self::AuthError(message),
            404 | 410 => Self::SessionExpired(message),
            429 => Self::RateLimited(1000),
            500..=599 => Self::ServerError(status, message),
            _ => Self::RequestFailed(message),
        }
    }

    /// Check if error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            YoutubeError::Network(_) | YoutubeError::RateLimited(_) | YoutubeError::ServerError(..)
        )
    }

    /// Suggested wait before retrying, if the server gave one.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            YoutubeError::RateLimited(ms) => Some(*ms),
            _ => None,
        }
    }
}
