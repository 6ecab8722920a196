//! Clip metadata models.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Platform-assigned identifier of a clip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct ClipId(pub String);

impl ClipId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ClipId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ClipId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A short externally hosted clip with view-count and ownership metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Clip {
    /// Platform clip identifier
    pub id: ClipId,
    /// Clip title as set on the platform
    pub title: String,
    /// Broadcaster display name reported by the platform
    pub broadcaster_name: String,
    /// Channel login the clip was found under
    pub channel: String,
    /// View count at query time
    pub view_count: u64,
    /// Public clip URL, handed to the downloader
    pub url: String,
    /// Creation time on the platform
    pub created_at: Option<DateTime<Utc>>,
}

impl Clip {
    /// Human-readable one-line summary for logs and chat messages.
    pub fn summary(&self) -> String {
        format!("{} ({} views)", self.title, self.view_count)
    }
}
