//! Twitch Helix REST client.
//!
//! Authenticates with the client-credentials grant. The app token is fetched
//! lazily, cached until shortly before expiry, and re-fetched once when a
//! request comes back 401.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use tracing::{debug, info, info_span, Instrument};

use crate::error::{TwitchError, TwitchResult};
use crate::metrics::{record_authentication, record_request};
use crate::types::{HelixClip, HelixPage, HelixUser, TokenResponse};

/// Refresh margin before the reported token expiry.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Lifetime assumed when the token response carries none.
const TOKEN_DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

/// Twitch client configuration.
#[derive(Debug, Clone)]
pub struct TwitchConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Identity service base URL (token endpoint is `{auth_url}/oauth2/token`)
    pub auth_url: String,
    /// Helix base URL (`{api_url}/helix/...`)
    pub api_url: String,
    /// How far back to look for clips
    pub lookback: chrono::Duration,
    /// Clips requested per channel
    pub clips_per_channel: u32,
    /// Request timeout
    pub timeout: Duration,
}

impl TwitchConfig {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            auth_url: "https://id.twitch.tv".to_string(),
            api_url: "https://api.twitch.tv".to_string(),
            lookback: chrono::Duration::days(14),
            clips_per_channel: 20,
            timeout: Duration::from_secs(30),
        }
    }

    /// Create config from environment variables.
    pub fn from_env() -> TwitchResult<Self> {
        let client_id = require_env("CLIENT_ID")?;
        let client_secret = require_env("CLIENT_SECRET")?;
        Ok(Self::new(client_id, client_secret))
    }

    /// Point both endpoints at one base URL (used against mock servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        self.auth_url = base_url.clone();
        self.api_url = base_url;
        self
    }
}

fn require_env(name: &str) -> TwitchResult<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(TwitchError::config(format!("{} must be set to access the Twitch API", name))),
    }
}

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_valid(&self) -> bool {
        Instant::now() + TOKEN_REFRESH_MARGIN < self.expires_at
    }
}

/// Twitch Helix API client.
pub struct HelixClient {
    http: Client,
    config: TwitchConfig,
    token: RwLock<Option<CachedToken>>,
}

impl HelixClient {
    pub fn new(config: TwitchConfig) -> TwitchResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("clipcast-twitch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(TwitchError::Network)?;

        Ok(Self {
            http,
            config,
            token: RwLock::new(None),
        })
    }

    pub fn from_env() -> TwitchResult<Self> {
        Self::new(TwitchConfig::from_env()?)
    }

    pub fn config(&self) -> &TwitchConfig {
        &self.config
    }

    /// Resolve a channel login to its broadcaster id.
    pub async fn get_user_id(&self, login: &str) -> TwitchResult<Option<String>> {
        let page: HelixPage<HelixUser> = self
            .get_json("get_users", "/helix/users", &[("login", login.to_string())])
            .await?;
        Ok(page.data.into_iter().next().map(|u| u.id))
    }

    /// Clips created between `started_at` and `ended_at` for a broadcaster,
    /// in platform order.
    ///
    /// Both bounds are always sent: Helix caps a missing `ended_at` at one
    /// week after `started_at`.
    pub async fn get_clips(
        &self,
        broadcaster_id: &str,
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
    ) -> TwitchResult<Vec<HelixClip>> {
        let query = [
            ("broadcaster_id", broadcaster_id.to_string()),
            ("first", self.config.clips_per_channel.to_string()),
            ("started_at", started_at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)),
            ("ended_at", ended_at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)),
        ];
        let page: HelixPage<HelixClip> = self.get_json("get_clips", "/helix/clips", &query).await?;
        Ok(page.data)
    }

    async fn access_token(&self) -> TwitchResult<String> {
        {
            let cache = self.token.read().await;
            if let Some(cached) = cache.as_ref().filter(|c| c.is_valid()) {
                return Ok(cached.access_token.clone());
            }
        }

        let mut cache = self.token.write().await;
        // Another task may have refreshed while we waited for the lock
        if let Some(cached) = cache.as_ref().filter(|c| c.is_valid()) {
            return Ok(cached.access_token.clone());
        }

        let token = self.authenticate().await?;
        let access_token = token.access_token.clone();
        *cache = Some(CachedToken {
            access_token: token.access_token,
            expires_at: Instant::now()
                + token.expires_in.map(Duration::from_secs).unwrap_or(TOKEN_DEFAULT_TTL),
        });
        Ok(access_token)
    }

    async fn invalidate_token(&self) {
        *self.token.write().await = None;
    }

    async fn authenticate(&self) -> TwitchResult<TokenResponse> {
        let url = format!("{}/oauth2/token", self.config.auth_url);
        let response = self
            .http
            .post(&url)
            .query(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TwitchError::auth_error(format!("token request returned {}: {}", status, body)));
        }

        let token: TokenResponse = response.json().await?;
        record_authentication();
        info!(expires_in = ?token.expires_in, "Obtained Twitch app access token");
        Ok(token)
    }

    async fn send_get(&self, url: &str, query: &[(&str, String)]) -> TwitchResult<reqwest::Response> {
        let token = self.access_token().await?;
        Ok(self
            .http
            .get(url)
            .header("Client-ID", &self.config.client_id)
            .bearer_auth(token)
            .query(query)
            .send()
            .await?)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> TwitchResult<T> {
        let url = format!("{}{}", self.config.api_url, path);
        let span = info_span!("twitch_request", operation = %operation);
        let start = Instant::now();

        let result = async {
            let mut response = self.send_get(&url, query).await?;

            if response.status() == StatusCode::UNAUTHORIZED {
                debug!("Helix returned 401, re-authenticating once");
                self.invalidate_token().await;
                response = self.send_get(&url, query).await?;
            }

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(TwitchError::from_http_status(
                    status.as_u16(),
                    format!("{} failed: {}", path, body),
                ));
            }

            let body = response.bytes().await?;
            serde_json::from_slice::<T>(&body)
                .map_err(|e| TwitchError::invalid_response(format!("{}: {}", path, e)))
        }
        .instrument(span)
        .await;

        let status = match &result {
            Ok(_) => 200,
            Err(e) => e.http_status().unwrap_or(500),
        };
        record_request(operation, status, start.elapsed().as_millis() as f64);

        result
    }
}
