//! Upload metadata for the video-publish API.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum title length accepted by the publish API (in characters).
pub const MAX_TITLE_CHARS: usize = 100;

/// Title prefix left behind by the vertical naming convention.
const VERTICAL_PREFIX: &str = "vertical ";

/// Visibility of a published video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum PrivacyStatus {
    #[default]
    Public,
    Unlisted,
    Private,
}

impl PrivacyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrivacyStatus::Public => "public",
            PrivacyStatus::Unlisted => "unlisted",
            PrivacyStatus::Private => "private",
        }
    }
}

impl fmt::Display for PrivacyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrivacyStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "public" => Ok(PrivacyStatus::Public),
            "unlisted" => Ok(PrivacyStatus::Unlisted),
            "private" => Ok(PrivacyStatus::Private),
            other => Err(format!("unknown privacy status: {}", other)),
        }
    }
}

/// Metadata attached to an uploaded video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct UploadMetadata {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    #[serde(default)]
    pub privacy_status: PrivacyStatus,
}

impl UploadMetadata {
    pub fn new(title: impl Into<String>, description: impl Into<String>, tags: Vec<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            tags,
            privacy_status: PrivacyStatus::default(),
        }
    }

    pub fn with_privacy(mut self, privacy_status: PrivacyStatus) -> Self {
        self.privacy_status = privacy_status;
        self
    }

    /// Title as it should be sent to the platform.
    ///
    /// Drops a case-insensitive `"vertical "` prefix, trims, and truncates to
    /// [`MAX_TITLE_CHARS`] characters.
    pub fn publish_title(&self) -> String {
        clean_title(&self.title)
    }
}

/// Strip the `"vertical "` prefix and enforce the platform title limit.
pub fn clean_title(title: &str) -> String {
    let stripped = match title.get(..VERTICAL_PREFIX.len()) {
        Some(head) if head.eq_ignore_ascii_case(VERTICAL_PREFIX) => &title[VERTICAL_PREFIX.len()..],
        _ => title,
    };
    stripped.trim().chars().take(MAX_TITLE_CHARS).collect()
}
