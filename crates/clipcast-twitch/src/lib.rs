//! Twitch Helix client and clip selection.
//!
//! This crate provides:
//! - An app-token Helix client (`users`, `clips`)
//! - The [`ClipSource`] seam and the [`ClipSelector`] ranking over it

pub mod client;
pub mod error;
pub mod metrics;
pub mod selector;
pub mod types;

pub use client::{HelixClient, TwitchConfig};
pub use error::{TwitchError, TwitchResult};
pub use selector::{ClipSelector, ClipSource};
