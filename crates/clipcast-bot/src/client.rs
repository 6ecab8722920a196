//! Telegram Bot API client.

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

use crate::error::{BotError, BotResult};
use crate::types::{ApiResponse, Update};

/// Bot configuration.
#[derive(Clone)]
pub struct TelegramConfig {
    pub token: String,
    /// Only this chat may issue commands and receive cycle reports.
    pub chat_id: Option<i64>,
    pub api_url: String,
    /// Long-poll timeout passed to `getUpdates`
    pub poll_timeout: Duration,
    /// Pause after a failed poll
    pub error_backoff: Duration,
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .field("api_url", &self.api_url)
            .field("poll_timeout", &self.poll_timeout)
            .finish()
    }
}

impl TelegramConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            chat_id: None,
            api_url: "https://api.telegram.org".to_string(),
            poll_timeout: Duration::from_secs(30),
            error_backoff: Duration::from_secs(5),
        }
    }

    /// Config from `BOT_TOKEN` and `CHAT_ID`; `None` when no token is set.
    pub fn from_env() -> BotResult<Option<Self>> {
        let token = match std::env::var("BOT_TOKEN") {
            Ok(token) if !token.trim().is_empty() => token.trim().to_string(),
            _ => return Ok(None),
        };

        let mut config = Self::new(token);
        if let Ok(raw) = std::env::var("CHAT_ID") {
            if !raw.trim().is_empty() {
                let chat_id = raw
                    .trim()
                    .parse()
                    .map_err(|_| BotError::config(format!("CHAT_ID is not a numeric chat id: {}", raw)))?;
                config.chat_id = Some(chat_id);
            }
        }
        Ok(Some(config))
    }

    pub fn with_chat_id(mut self, chat_id: i64) -> Self {
        self.chat_id = Some(chat_id);
        self
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn with_poll_timeout(mut self, poll_timeout: Duration) -> Self {
        self.poll_timeout = poll_timeout;
        self
    }
}

/// Minimal Bot API client: long polling and plain-text replies.
pub struct TelegramClient {
    http: Client,
    config: TelegramConfig,
}

impl TelegramClient {
    pub fn new(config: TelegramConfig) -> BotResult<Self> {
        let http = Client::builder()
            .user_agent(concat!("clipcast-bot/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(BotError::Network)?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &TelegramConfig {
        &self.config
    }

    /// Long-poll for updates after `offset`.
    pub async fn get_updates(&self, offset: Option<i64>) -> BotResult<Vec<Update>> {
        let body = json!({
            "offset": offset,
            "timeout": self.config.poll_timeout.as_secs(),
            "allowed_updates": ["message"],
        });
        // The HTTP timeout has to outlast the server-side long poll
        let timeout = self.config.poll_timeout + Duration::from_secs(10);
        self.call("getUpdates", &body, timeout).await
    }

    /// Send a plain-text message.
    pub async fn send_message(&self, chat_id: i64, text: &str) -> BotResult<()> {
        let body = json!({
            "chat_id": chat_id,
            "text": text,
            "disable_web_page_preview": true,
        });
        let _: serde_json::Value = self.call("sendMessage", &body, Duration::from_secs(30)).await?;
        debug!(chat_id, "Sent chat message");
        Ok(())
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: &serde_json::Value,
        timeout: Duration,
    ) -> BotResult<T> {
        // Never log this URL, it carries the bot token
        let url = format!("{}/bot{}/{}", self.config.api_url, self.config.token, method);
        let response = self.http.post(&url).timeout(timeout).json(body).send().await?;

        let status = response.status();
        let text = response.text().await?;
        let envelope: ApiResponse<T> = serde_json::from_str(&text).map_err(|e| {
            BotError::invalid_response(format!("{} returned {} with unreadable body: {}", method, status, e))
        })?;

        if !envelope.ok {
            let code = envelope.error_code.unwrap_or(status.as_u16());
            let retry_after = envelope.parameters.and_then(|p| p.retry_after);
            return Err(BotError::from_api_error(
                code,
                envelope.description.unwrap_or_else(|| status.to_string()),
                retry_after,
            ));
        }

        envelope
            .result
            .ok_or_else(|| BotError::invalid_response(format!("{} returned ok without a result", method)))
    }
}
