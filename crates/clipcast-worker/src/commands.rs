//! Chat command handling.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use clipcast_bot::{BotCommand, CommandHandler};

use crate::metrics::record_manual_trigger;
use crate::status::StatusBoard;
use crate::trigger::ManualTrigger;

/// Answers `/start`, `/make` and `/status`.
pub struct ChatCommands {
    trigger: Arc<ManualTrigger>,
    status: Arc<StatusBoard>,
}

impl ChatCommands {
    pub fn new(trigger: Arc<ManualTrigger>, status: Arc<StatusBoard>) -> Self {
        Self { trigger, status }
    }
}

#[async_trait]
impl CommandHandler for ChatCommands {
    async fn handle(&self, command: BotCommand) -> String {
        match command {
            BotCommand::Start => "Bot is ready. Use /make to run a cycle now and /status to see what it is doing.".to_string(),
            BotCommand::Make => {
                if !self.trigger.request().await {
                    return "A manual run is already pending.".to_string();
                }
                record_manual_trigger();
                info!("Manual run requested");

                if self.status.state().await.is_busy() {
                    "A cycle is running now; the manual run starts when it finishes.".to_string()
                } else {
                    "The cycle will start shortly.".to_string()
                }
            }
            BotCommand::Status => self.status.snapshot().await.render(self.trigger.is_pending()),
        }
    }
}
