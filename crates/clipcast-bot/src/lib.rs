//! Telegram command surface.
//!
//! This crate provides:
//! - A long-polling Bot API client
//! - `/start`, `/make` and `/status` parsing and dispatch to a [`CommandHandler`]
//! - The [`Notifier`] seam used to relay cycle outcomes to a fixed chat

pub mod client;
pub mod command;
pub mod error;
pub mod listener;
pub mod notifier;
pub mod types;

pub use client::{TelegramClient, TelegramConfig};
pub use command::BotCommand;
pub use error::{BotError, BotResult};
pub use listener::{BotListener, CommandHandler};
pub use notifier::{Notifier, NullNotifier, TelegramNotifier};
