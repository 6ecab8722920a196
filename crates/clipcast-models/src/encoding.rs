//! Output encoding settings.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Vertical canvas resolution.
pub const VERTICAL_WIDTH: u32 = 1080;
pub const VERTICAL_HEIGHT: u32 = 1920;

/// H.264 video plus AAC audio settings for an FFmpeg output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct EncodingConfig {
    pub codec: String,
    pub preset: String,
    /// Constant Rate Factor, 0-51, lower is better
    pub crf: u8,
    pub audio_codec: String,
    pub audio_bitrate: String,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            codec: "libx264".to_string(),
            preset: "fast".to_string(),
            crf: 20,
            audio_codec: "aac".to_string(),
            audio_bitrate: "128k".to_string(),
        }
    }
}

impl EncodingConfig {
    /// Settings for the silent intermediate stream, which is re-encoded when
    /// the audio is attached.
    pub fn for_intermediate() -> Self {
        Self {
            preset: "ultrafast".to_string(),
            crf: 12,
            ..Default::default()
        }
    }

    /// Video-only output arguments.
    pub fn video_args(&self) -> Vec<String> {
        [
            "-c:v",
            self.codec.as_str(),
            "-preset",
            self.preset.as_str(),
            "-crf",
            self.crf.to_string().as_str(),
            "-pix_fmt",
            "yuv420p",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }

    /// Video and audio output arguments.
    pub fn to_ffmpeg_args(&self) -> Vec<String> {
        let mut args = self.video_args();
        args.extend(["-c:a", self.audio_codec.as_str(), "-b:a", self.audio_bitrate.as_str()].map(String::from));
        args
    }
}
