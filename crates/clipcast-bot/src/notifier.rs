//! Outbound cycle reports.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::client::TelegramClient;
use crate::error::BotResult;

/// Delivers short status messages to an operator.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, text: &str) -> BotResult<()>;
}

/// Drops every message; used when no chat is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

#[async_trait]
impl Notifier for NullNotifier {
    async fn notify(&self, text: &str) -> BotResult<()> {
        debug!("No chat configured, dropping report: {}", text);
        Ok(())
    }
}

/// Sends reports to a fixed chat.
pub struct TelegramNotifier {
    client: Arc<TelegramClient>,
    chat_id: i64,
}

impl TelegramNotifier {
    pub fn new(client: Arc<TelegramClient>, chat_id: i64) -> Self {
        Self { client, chat_id }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, text: &str) -> BotResult<()> {
        self.client.send_message(self.chat_id, text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::TelegramConfig;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_null_notifier_accepts_everything() {
        NullNotifier.notify("cycle finished").await.unwrap();
    }

    #[tokio::test]
    async fn test_telegram_notifier_targets_configured_chat() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/botT/sendMessage"))
            .and(body_partial_json(json!({"chat_id": -100123, "text": "Video uploaded"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true, "result": {}})))
            .expect(1)
            .mount(&server)
            .await;

        let client = TelegramClient::new(TelegramConfig::new("T").with_api_url(server.uri())).unwrap();
        let notifier = TelegramNotifier::new(Arc::new(client), -100123);
        notifier.notify("Video uploaded").await.unwrap();
    }
}
