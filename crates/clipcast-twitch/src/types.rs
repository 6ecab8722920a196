//! Helix wire types.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use clipcast_models::{Clip, ClipId};

/// App access token from the client-credentials grant.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// Lifetime in seconds
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// Helix list envelope: `{"data": [...]}`.
#[derive(Debug, Clone, Deserialize)]
pub struct HelixPage<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HelixUser {
    pub id: String,
    pub login: String,
    #[serde(default)]
    pub display_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HelixClip {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub broadcaster_id: String,
    #[serde(default)]
    pub broadcaster_name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub view_count: u64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl HelixClip {
    /// Convert into the pipeline model, tagging the channel it was found under.
    pub fn into_clip(self, channel: &str) -> Clip {
        Clip {
            id: ClipId::from(self.id),
            title: self.title,
            broadcaster_name: self.broadcaster_name,
            channel: channel.to_string(),
            view_count: self.view_count,
            url: self.url,
            created_at: self.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_clips_page() {
        let body = r#"{
            "data": [{
                "id": "AwkwardHelplessSalamanderSwiftRage",
                "url": "https://clips.twitch.tv/AwkwardHelplessSalamanderSwiftRage",
                "embed_url": "https://clips.twitch.tv/embed?clip=AwkwardHelplessSalamanderSwiftRage",
                "broadcaster_id": "67955580",
                "broadcaster_name": "ChewieMelodies",
                "title": "babymetal",
                "view_count": 10,
                "created_at": "2017-11-30T22:34:18Z",
                "duration": 12.9
            }],
            "pagination": {}
        }"#;

        let page: HelixPage<HelixClip> = serde_json::from_str(body).unwrap();
        let clip = page.data.into_iter().next().unwrap().into_clip("chewiemelodies");
        assert_eq!(clip.id.as_str(), "AwkwardHelplessSalamanderSwiftRage");
        assert_eq!(clip.channel, "chewiemelodies");
        assert_eq!(clip.view_count, 10);
        assert!(clip.created_at.is_some());
    }

    #[test]
    fn test_missing_data_is_empty() {
        let page: HelixPage<HelixUser> = serde_json::from_str("{}").unwrap();
        assert!(page.data.is_empty());
    }
}
