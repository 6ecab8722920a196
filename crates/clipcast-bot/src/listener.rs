//! Long-polling command loop.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::client::TelegramClient;
use crate::command::BotCommand;
use crate::error::{BotError, BotResult};
use crate::types::Update;

/// Turns a command into the reply text.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(&self, command: BotCommand) -> String;
}

/// Polls for commands and answers them until shutdown.
pub struct BotListener {
    client: Arc<TelegramClient>,
    handler: Arc<dyn CommandHandler>,
    offset: Option<i64>,
}

impl BotListener {
    pub fn new(client: Arc<TelegramClient>, handler: Arc<dyn CommandHandler>) -> Self {
        Self {
            client,
            handler,
            offset: None,
        }
    }

    /// Offset of the next update to fetch.
    pub fn offset(&self) -> Option<i64> {
        self.offset
    }

    /// Run until the shutdown flag flips or its sender goes away.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(chat_id = ?self.client.config().chat_id, "Starting chat command listener");

        loop {
            let result = tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
                result = self.poll_once() => result,
            };

            let Err(e) = result else {
                continue;
            };
            let delay = self.backoff_for(&e);
            warn!(delay_secs = delay.as_secs(), "Polling for chat commands failed: {}", e);

            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }

        info!("Chat command listener stopped");
    }

    /// Fetch one batch of updates and answer every command in it.
    ///
    /// Returns the number of commands handled.
    pub async fn poll_once(&mut self) -> BotResult<usize> {
        let updates = self.client.get_updates(self.offset).await?;
        let mut handled = 0;

        for update in updates {
            // Acknowledge before handling so a failed reply is not redelivered
            self.offset = Some(update.update_id + 1);
            if self.handle_update(&update).await {
                handled += 1;
            }
        }

        Ok(handled)
    }

    async fn handle_update(&self, update: &Update) -> bool {
        let Some(message) = &update.message else {
            return false;
        };
        let Some(command) = message.text.as_deref().and_then(BotCommand::parse) else {
            return false;
        };

        if let Some(allowed) = self.client.config().chat_id {
            if message.chat.id != allowed {
                debug!(chat_id = message.chat.id, command = %command, "Ignoring command from unknown chat");
                return false;
            }
        }

        info!(
            chat_id = message.chat.id,
            user = message.from.as_ref().and_then(|u| u.username.as_deref()).unwrap_or("-"),
            command = %command,
            "Received chat command"
        );

        let reply = self.handler.handle(command).await;
        if let Err(e) = self.client.send_message(message.chat.id, &reply).await {
            warn!(chat_id = message.chat.id, "Failed to reply to {}: {}", command, e);
        }
        true
    }

    fn backoff_for(&self, error: &BotError) -> Duration {
        match error {
            BotError::RateLimited(secs) => Duration::from_secs(*secs),
            _ => self.client.config().error_backoff,
        }
    }
}
