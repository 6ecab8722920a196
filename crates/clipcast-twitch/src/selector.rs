//! Best-clip selection across a set of channels.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, warn};

use clipcast_models::{Clip, ClipId};

use crate::client::HelixClient;
use crate::error::TwitchResult;

/// Source of channel and clip listings.
#[async_trait]
pub trait ClipSource: Send + Sync {
    /// Platform id for a channel login, `None` if it does not exist.
    async fn resolve_channel(&self, login: &str) -> TwitchResult<Option<String>>;

    /// Recent clips of a broadcaster in platform order, tagged with `channel`.
    async fn recent_clips(&self, broadcaster_id: &str, channel: &str) -> TwitchResult<Vec<Clip>>;
}

#[async_trait]
impl ClipSource for HelixClient {
    async fn resolve_channel(&self, login: &str) -> TwitchResult<Option<String>> {
        self.get_user_id(login).await
    }

    async fn recent_clips(&self, broadcaster_id: &str, channel: &str) -> TwitchResult<Vec<Clip>> {
        let now = Utc::now();
        let clips = self.get_clips(broadcaster_id, now - self.config().lookback, now).await?;
        Ok(clips.into_iter().map(|c| c.into_clip(channel)).collect())
    }
}

/// Picks the most viewed clip not yet published.
#[derive(Clone)]
pub struct ClipSelector {
    source: Arc<dyn ClipSource>,
}

impl ClipSelector {
    pub fn new(source: Arc<dyn ClipSource>) -> Self {
        Self { source }
    }

    /// Highest view count among unseen clips of `channels`.
    ///
    /// Channels that cannot be resolved or listed are skipped with a warning.
    /// Equal view counts keep channel order, then platform order. Returns the
    /// last error only when every channel failed.
    pub async fn select_best(&self, channels: &[String], excluded: &HashSet<ClipId>) -> TwitchResult<Option<Clip>> {
        let mut candidates = Vec::new();
        let mut last_error = None;
        let mut reachable = 0usize;

        for channel in channels {
            match self.channel_clips(channel).await {
                Ok(clips) => {
                    reachable += 1;
                    let total = clips.len();
                    candidates.extend(clips.into_iter().filter(|c| !excluded.contains(&c.id)));
                    debug!(channel = %channel, total, "Listed channel clips");
                }
                Err(e) => {
                    warn!(channel = %channel, "Skipping channel: {}", e);
                    last_error = Some(e);
                }
            }
        }

        if reachable == 0 {
            if let Some(e) = last_error {
                return Err(e);
            }
        }

        // Stable sort keeps the first of equally viewed clips on top
        candidates.sort_by(|a, b| b.view_count.cmp(&a.view_count));
        let best = candidates.into_iter().next();

        match &best {
            Some(clip) => info!(clip_id = %clip.id, channel = %clip.channel, "Selected clip: {}", clip.summary()),
            None => info!("No new clips found"),
        }
        Ok(best)
    }

    async fn channel_clips(&self, channel: &str) -> TwitchResult<Vec<Clip>> {
        let Some(broadcaster_id) = self.source.resolve_channel(channel).await? else {
            warn!(channel = %channel, "Channel not found, skipping");
            return Ok(Vec::new());
        };
        self.source.recent_clips(&broadcaster_id, channel).await
    }
}
