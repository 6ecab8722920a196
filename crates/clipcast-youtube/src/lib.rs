//! YouTube Data API v3 upload client.
//!
//! Publishes finished Shorts with the resumable upload protocol:
//! - Refresh-token OAuth with a cached access token
//! - Chunked transfer with `Content-Range`, resuming from the server's offset
//! - Bounded exponential backoff on transient failures

pub mod auth;
pub mod error;
pub mod metrics;
pub mod retry;
pub mod uploader;

pub use auth::{OAuthCredentials, TokenCache, TokenProvider};
pub use error::{YoutubeError, YoutubeResult};
pub use retry::RetryConfig;
pub use uploader::{Publisher, UploadProgress, YoutubeConfig, YoutubeUploader};
