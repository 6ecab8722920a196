//! OAuth access tokens for the upload API.
//!
//! Tokens come from the refresh-token grant and are cached with:
//! - Refresh margin to avoid expiry during an upload
//! - Single-flight refresh behind a write lock
//! - Fallback to the current token if a refresh fails while it is still usable

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::{YoutubeError, YoutubeResult};

/// Refresh margin: refresh token 60 seconds before expiry.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Token TTL when the response carries no expiry.
const TOKEN_DEFAULT_TTL: Duration = Duration::from_secs(50 * 60);

pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Long-lived credentials of an authorized user.
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl OAuthCredentials {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            refresh_token: refresh_token.into(),
            token_uri: default_token_uri(),
        }
    }

    pub fn with_token_uri(mut self, token_uri: impl Into<String>) -> Self {
        self.token_uri = token_uri.into();
        self
    }

    /// Load an authorized-user JSON file (`client_id`, `client_secret`,
    /// `refresh_token`, optional `token_uri`).
    pub fn from_file(path: &Path) -> YoutubeResult<Self> {
        if !path.exists() {
            return Err(YoutubeError::FileNotFound(path.to_path_buf()));
        }
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw)
            .map_err(|e| YoutubeError::config(format!("invalid credentials file {}: {}", path.display(), e)))
    }

    /// Credentials from `YOUTUBE_CLIENT_ID`, `YOUTUBE_CLIENT_SECRET` and
    /// `YOUTUBE_REFRESH_TOKEN`, or else from `YOUTUBE_TOKEN_FILE`
    /// (default `token.json`).
    pub fn from_env() -> YoutubeResult<Self> {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

        match (
            var("YOUTUBE_CLIENT_ID"),
            var("YOUTUBE_CLIENT_SECRET"),
            var("YOUTUBE_REFRESH_TOKEN"),
        ) {
            (Some(id), Some(secret), Some(refresh)) => Ok(Self::new(id, secret, refresh)),
            _ => {
                let path = var("YOUTUBE_TOKEN_FILE").unwrap_or_else(|| "token.json".to_string());
                Self::from_file(Path::new(&path)).map_err(|e| {
                    YoutubeError::config(format!(
                        "YouTube credentials missing: set YOUTUBE_CLIENT_ID/SECRET/REFRESH_TOKEN or provide {} ({})",
                        path, e
                    ))
                })
            }
        }
    }
}

/// A freshly issued access token.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_in: Option<Duration>,
}

/// Source of access tokens.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn fetch_token(&self) -> YoutubeResult<AccessToken>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// Exchanges a refresh token for access tokens.
pub struct RefreshTokenProvider {
    http: Client,
    credentials: OAuthCredentials,
}

impl RefreshTokenProvider {
    pub fn new(http: Client, credentials: OAuthCredentials) -> Self {
        Self { http, credentials }
    }
}

#[async_trait]
impl TokenProvider for RefreshTokenProvider {
    async fn fetch_token(&self) -> YoutubeResult<AccessToken> {
        let response = self
            .http
            .post(&self.credentials.token_uri)
            .form(&[
                ("client_id", self.credentials.client_id.as_str()),
                ("client_secret", self.credentials.client_secret.as_str()),
                ("refresh_token", self.credentials.refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(YoutubeError::auth_error(format!("token refresh returned {}: {}", status, body)));
        }

        let token: TokenResponse = response.json().await?;
        Ok(AccessToken {
            token: token.access_token,
            expires_in: token.expires_in.map(Duration::from_secs),
        })
    }
}

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

impl CachedToken {
    /// Valid with the refresh margin applied.
    fn is_valid(&self) -> bool {
        Instant::now() + TOKEN_REFRESH_MARGIN < self.expires_at
    }

    /// Not yet expired, even if a refresh is due.
    fn is_usable(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// Thread-safe token cache with single-flight refresh.
pub struct TokenCache {
    auth: Arc<dyn TokenProvider>,
    cache: RwLock<Option<CachedToken>>,
}

impl TokenCache {
    pub fn new(auth: Arc<dyn TokenProvider>) -> Self {
        Self {
            auth,
            cache: RwLock::new(None),
        }
    }

    /// Drop the cached token so the next call refreshes.
    pub async fn invalidate(&self) {
        *self.cache.write().await = None;
    }

    /// Get a valid access token, refreshing if necessary.
    pub async fn get_token(&self) -> YoutubeResult<String> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref().filter(|c| c.is_valid()) {
                return Ok(cached.access_token.clone());
            }
        }

        let mut cache = self.cache.write().await;

        // Double-check: another task may have refreshed while we waited
        if let Some(cached) = cache.as_ref().filter(|c| c.is_valid()) {
            return Ok(cached.access_token.clone());
        }

        match self.auth.fetch_token().await {
            Ok(token) => {
                let ttl = token.expires_in.unwrap_or(TOKEN_DEFAULT_TTL);
                *cache = Some(CachedToken {
                    access_token: token.token.clone(),
                    expires_at: Instant::now() + ttl,
                });
                debug!(ttl_secs = ttl.as_secs(), "Refreshed YouTube access token");
                Ok(token.token)
            }
            Err(e) => match cache.as_ref().filter(|c| c.is_usable()) {
                Some(cached) => {
                    warn!("Token refresh failed, using existing token: {}", e);
                    Ok(cached.access_token.clone())
                }
                None => Err(e),
            },
        }
    }
}

/// Build the token cache for the given credentials.
pub fn token_cache_for(http: Client, credentials: OAuthCredentials) -> TokenCache {
    info!(token_uri = %credentials.token_uri, "Using refresh-token authentication");
    TokenCache::new(Arc::new(RefreshTokenProvider::new(http, credentials)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct CountingProvider {
        calls: AtomicU32,
        ttl: Duration,
    }

    #[async_trait]
    impl TokenProvider for CountingProvider {
        async fn fetch_token(&self) -> YoutubeResult<AccessToken> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(AccessToken {
                token: format!("token-{}", n),
                expires_in: Some(self.ttl),
            })
        }
    }

    #[tokio::test]
    async fn test_cache_reuses_valid_token() {
        let provider = Arc::new(CountingProvider {
            calls: AtomicU32::new(0),
            ttl: Duration::from_secs(3600),
        });
        let cache = TokenCache::new(provider.clone());

        assert_eq!(cache.get_token().await.unwrap(), "token-1");
        assert_eq!(cache.get_token().await.unwrap(), "token-1");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

        cache.invalidate().await;
        assert_eq!(cache.get_token().await.unwrap(), "token-2");
    }

    #[tokio::test]
    async fn test_token_inside_margin_is_refreshed() {
        let provider = Arc::new(CountingProvider {
            calls: AtomicU32::new(0),
            ttl: Duration::from_secs(30),
        });
        let cache = TokenCache::new(provider.clone());

        cache.get_token().await.unwrap();
        cache.get_token().await.unwrap();
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_refresh_token_grant() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=r-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "ya29.fresh",
                "expires_in": 3599,
                "token_type": "Bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let credentials =
            OAuthCredentials::new("cid", "secret", "r-123").with_token_uri(format!("{}/token", server.uri()));
        let cache = token_cache_for(Client::new(), credentials);
        assert_eq!(cache.get_token().await.unwrap(), "ya29.fresh");
    }

    #[test]
    fn test_credentials_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("token.json");
        std::fs::write(
            &file,
            r#"{"client_id": "c", "client_secret": "s", "refresh_token": "r", "token": "old", "scopes": []}"#,
        )
        .unwrap();

        let creds = OAuthCredentials::from_file(&file).unwrap();
        assert_eq!(creds.refresh_token, "r");
        assert_eq!(creds.token_uri, DEFAULT_TOKEN_URI);

        assert!(matches!(
            OAuthCredentials::from_file(&dir.path().join("missing.json")),
            Err(YoutubeError::FileNotFound(_))
        ));
    }
}
