//! Clip download using yt-dlp.

use async_trait::async_trait;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::LazyLock;
use tokio::process::Command;
use tracing::{debug, info, warn};

use clipcast_models::Clip;

use crate::command::check_ytdlp;
use crate::error::{MediaError, MediaResult};

/// Longest file stem (in bytes) used for downloaded clips.
const MAX_STEM_BYTES: usize = 200;

/// Capability to fetch a clip to local storage.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Download `clip` into `destination_dir` and return the local path.
    async fn download(&self, clip: &Clip, destination_dir: &Path) -> MediaResult<PathBuf>;
}

/// [`Fetcher`] backed by the yt-dlp command line tool.
#[derive(Debug, Clone, Default)]
pub struct YtDlpFetcher;

impl YtDlpFetcher {
    pub fn new() -> Self {
        Self
    }

    fn build_args(&self, output_path: &Path, url: &str) -> Vec<String> {
        vec![
            "-o".to_string(),
            output_path.to_string_lossy().to_string(),
            "--no-playlist".to_string(),
            "--no-progress".to_string(),
            "--merge-output-format".to_string(),
            "mp4".to_string(),
            url.to_string(),
        ]
    }
}

#[async_trait]
impl Fetcher for YtDlpFetcher {
    async fn download(&self, clip: &Clip, destination_dir: &Path) -> MediaResult<PathBuf> {
        tokio::fs::create_dir_all(destination_dir).await?;
        let output_path = destination_dir.join(clip_filename(clip));

        if let Ok(metadata) = tokio::fs::metadata(&output_path).await {
            if metadata.len() > 0 {
                info!(
                    clip_id = %clip.id,
                    path = %output_path.display(),
                    "Clip already downloaded, reusing ({} bytes)",
                    metadata.len()
                );
                return Ok(output_path);
            }
        }

        check_ytdlp()?;

        let args = self.build_args(&output_path, &clip.url);
        debug!("Running yt-dlp {}", args.join(" "));
        info!(clip_id = %clip.id, url = %clip.url, "Downloading clip");

        let output = Command::new("yt-dlp")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(clip_id = %clip.id, "yt-dlp failed: {}", stderr.trim());
            return Err(MediaError::download_failed(format!(
                "yt-dlp exited with {:?}: {}",
                output.status.code(),
                stderr.lines().last().unwrap_or("").trim()
            )));
        }

        if !output_path.exists() {
            return Err(MediaError::download_failed(format!(
                "yt-dlp reported success but {} is missing",
                output_path.display()
            )));
        }

        let file_size = tokio::fs::metadata(&output_path).await?.len();
        info!(
            clip_id = %clip.id,
            path = %output_path.display(),
            "Downloaded clip ({:.2} MB)",
            file_size as f64 / (1024.0 * 1024.0)
        );

        Ok(output_path)
    }
}

static FORBIDDEN_CHARS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"[\\/:"*?<>|]+"#).unwrap());

/// Replace every run of filesystem-hostile characters with a single `_`.
pub fn sanitize_filename(name: &str) -> String {
    FORBIDDEN_CHARS.replace_all(name, "_").into_owned()
}

/// File name for a downloaded clip: `"{channel} - {title}.mp4"`, sanitized.
pub fn clip_filename(clip: &Clip) -> String {
    let stem = sanitize_filename(&format!("{} - {}", clip.channel, clip.title));
    let stem = stem.trim();

    let mut end = stem.len().min(MAX_STEM_BYTES);
    while !stem.is_char_boundary(end) {
        end -= 1;
    }

    format!("{}.mp4", &stem[..end])
}
