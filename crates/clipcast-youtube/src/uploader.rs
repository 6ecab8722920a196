//! Resumable video upload to the YouTube Data API v3.

use std::io::SeekFrom;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{CONTENT_LENGTH, CONTENT_RANGE, LOCATION, RANGE};
use reqwest::{redirect, Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::{debug, info, info_span, warn, Instrument};

use clipcast_models::upload::clean_title;
use clipcast_models::UploadMetadata;

use crate::auth::{token_cache_for, OAuthCredentials, TokenCache};
use crate::error::{YoutubeError, YoutubeResult};
use crate::metrics::{record_bytes, record_chunk_retry, record_upload};
use crate::retry::RetryConfig;

/// Chunk sizes must be multiples of this.
pub const CHUNK_ALIGNMENT: u64 = 256 * 1024;
/// Default chunk size (8 MiB).
pub const DEFAULT_CHUNK_SIZE: u64 = 8 * 1024 * 1024;
/// "Gaming"
pub const DEFAULT_CATEGORY_ID: &str = "20";

/// Upload client configuration.
#[derive(Debug, Clone)]
pub struct YoutubeConfig {
    /// API base URL (`{api_url}/upload/youtube/v3/videos`)
    pub api_url: String,
    /// Bytes per chunk, a multiple of [`CHUNK_ALIGNMENT`]
    pub chunk_size: u64,
    pub category_id: String,
    pub retry: RetryConfig,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for YoutubeConfig {
    fn default() -> Self {
        Self {
            api_url: "https://www.googleapis.com".to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            category_id: DEFAULT_CATEGORY_ID.to_string(),
            retry: RetryConfig::default(),
            timeout: Duration::from_secs(300),
        }
    }
}

impl YoutubeConfig {
    /// Create config from environment variables.
    pub fn from_env() -> YoutubeResult<Self> {
        let mut config = Self::default();

        if let Ok(raw) = std::env::var("YOUTUBE_CHUNK_SIZE_MB") {
            let mb: u64 = raw
                .trim()
                .parse()
                .map_err(|_| YoutubeError::config(format!("YOUTUBE_CHUNK_SIZE_MB is not a number: {}", raw)))?;
            config = config.with_chunk_size(mb.saturating_mul(1024 * 1024));
        }

        if let Ok(category) = std::env::var("YOUTUBE_CATEGORY_ID") {
            if !category.trim().is_empty() {
                config.category_id = category.trim().to_string();
            }
        }

        Ok(config)
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    /// Set the chunk size, rounded up to a multiple of [`CHUNK_ALIGNMENT`].
    pub fn with_chunk_size(mut self, bytes: u64) -> Self {
        let chunks = bytes.div_ceil(CHUNK_ALIGNMENT).max(1);
        self.chunk_size = chunks * CHUNK_ALIGNMENT;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

/// Upload progress snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadProgress {
    pub bytes_sent: u64,
    pub total_bytes: u64,
}

impl UploadProgress {
    /// Fraction acknowledged by the server, in `[0, 1]`.
    pub fn fraction(&self) -> f64 {
        if self.total_bytes == 0 {
            return 1.0;
        }
        (self.bytes_sent as f64 / self.total_bytes as f64).clamp(0.0, 1.0)
    }
}

/// Callback for upload progress.
pub type ProgressFn = Arc<dyn Fn(UploadProgress) + Send + Sync>;

/// Publishes a finished file and returns the platform id.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, file: &Path, metadata: &UploadMetadata) -> YoutubeResult<String>;
}

/// Server state after a chunk or status query.
#[derive(Debug, PartialEq, Eq)]
enum UploadState {
    /// Upload continues at this byte offset.
    Incomplete(u64),
    /// Upload finished; carries the video id.
    Complete(String),
}

#[derive(Debug, Deserialize)]
struct VideoResource {
    id: String,
}

/// Resumable-upload [`Publisher`].
pub struct YoutubeUploader {
    http: Client,
    config: YoutubeConfig,
    tokens: Arc<TokenCache>,
    progress: Option<ProgressFn>,
}

impl YoutubeUploader {
    pub fn new(config: YoutubeConfig, credentials: OAuthCredentials) -> YoutubeResult<Self> {
        // 308 means "resume incomplete" here, never a redirect to follow
        let http = Client::builder()
            .redirect(redirect::Policy::none())
            .timeout(config.timeout)
            .user_agent(concat!("clipcast-youtube/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(YoutubeError::Network)?;

        let tokens = Arc::new(token_cache_for(http.clone(), credentials));
        Ok(Self {
            http,
            config,
            tokens,
            progress: None,
        })
    }

    pub fn from_env() -> YoutubeResult<Self> {
        Self::new(YoutubeConfig::from_env()?, OAuthCredentials::from_env()?)
    }

    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    fn report(&self, bytes_sent: u64, total_bytes: u64) {
        let progress = UploadProgress {
            bytes_sent,
            total_bytes,
        };
        info!("Upload progress: {:.0}%", progress.fraction() * 100.0);
        if let Some(callback) = &self.progress {
            callback(progress);
        }
    }

    async fn start_session(&self, title: &str, metadata: &UploadMetadata, total: u64) -> YoutubeResult<String> {
        let url = format!("{}/upload/youtube/v3/videos", self.config.api_url);
        let body = json!({
            "snippet": {
                "title": title,
                "description": metadata.description,
                "tags": metadata.tags,
                "categoryId": self.config.category_id,
            },
            "status": {
                "privacyStatus": metadata.privacy_status.as_str(),
                "selfDeclaredMadeForKids": false,
            }
        });

        let mut reauthenticated = false;
        loop {
            let token = self.tokens.get_token().await?;
            let response = self
                .http
                .post(&url)
                .query(&[("uploadType", "resumable"), ("part", "snippet,status")])
                .bearer_auth(&token)
                .header("X-Upload-Content-Length", total.to_string())
                .header("X-Upload-Content-Type", "video/mp4")
                .json(&body)
                .send()
                .await?;

            let status = response.status();
            if status == StatusCode::UNAUTHORIZED && !reauthenticated {
                debug!("Upload session start returned 401, refreshing token");
                self.tokens.invalidate().await;
                reauthenticated = true;
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(YoutubeError::from_http_status(
                    status.as_u16(),
                    format!("starting upload session failed: {}", body),
                ));
            }

            return response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
                .ok_or_else(|| YoutubeError::invalid_response("upload session response has no Location header"));
        }
    }

    async fn put_chunk(&self, session: &str, file: &mut File, offset: u64, total: u64) -> YoutubeResult<UploadState> {
        let len = self.config.chunk_size.min(total - offset);
        file.seek(SeekFrom::Start(offset)).await?;
        let mut buf = Vec::with_capacity(len as usize);
        (&mut *file).take(len).read_to_end(&mut buf).await?;
        if buf.len() as u64 != len {
            return Err(YoutubeError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "file shrank during upload",
            )));
        }

        let token = self.tokens.get_token().await?;
        let response = self
            .http
            .put(session)
            .bearer_auth(&token)
            .header(CONTENT_LENGTH, len)
            .header(CONTENT_RANGE, format!("bytes {}-{}/{}", offset, offset + len - 1, total))
            .body(buf)
            .send()
            .await?;

        Self::upload_state(response).await
    }

    async fn query_status(&self, session: &str, total: u64) -> YoutubeResult<UploadState> {
        let token = self.tokens.get_token().await?;
        let response = self
            .http
            .put(session)
            .bearer_auth(&token)
            .header(CONTENT_LENGTH, 0)
            .header(CONTENT_RANGE, format!("bytes */{}", total))
            .send()
            .await?;

        Self::upload_state(response).await
    }

    async fn upload_state(response: reqwest::Response) -> YoutubeResult<UploadState> {
        let status = response.status();
        match status.as_u16() {
            308 => Ok(UploadState::Incomplete(next_offset(
                response.headers().get(RANGE).and_then(|v| v.to_str().ok()),
            ))),
            200 | 201 => {
                let video: VideoResource = response
                    .json()
                    .await
                    .map_err(|e| YoutubeError::invalid_response(format!("upload response has no id: {}", e)))?;
                Ok(UploadState::Complete(video.id))
            }
            code => {
                let body = response.text().await.unwrap_or_default();
                Err(YoutubeError::from_http_status(code, format!("chunk upload failed: {}", body)))
            }
        }
    }

    async fn upload_file(&self, session: &str, path: &Path, total: u64) -> YoutubeResult<String> {
        let mut file = File::open(path).await?;
        let mut offset = 0u64;
        let mut retries = 0u32;

        loop {
            let error = match self.put_chunk(session, &mut file, offset, total).await {
                Ok(UploadState::Complete(id)) => {
                    record_bytes(total - offset);
                    self.report(total, total);
                    return Ok(id);
                }
                Ok(UploadState::Incomplete(next)) if next > offset => {
                    record_bytes(next - offset);
                    offset = next;
                    self.report(offset, total);
                    continue;
                }
                Ok(UploadState::Incomplete(next)) => {
                    YoutubeError::invalid_response(format!("server kept offset at {} after chunk at {}", next, offset))
                }
                Err(e) => e,
            };

            let recoverable = error.is_retryable()
                || matches!(error, YoutubeError::TokenRejected(_) | YoutubeError::InvalidResponse(_));
            if !recoverable || retries >= self.config.retry.max_retries {
                return Err(error);
            }

            if matches!(error, YoutubeError::TokenRejected(_)) {
                self.tokens.invalidate().await;
            }

            let delay = self.config.retry.delay_for(retries, error.retry_after_ms());
            retries += 1;
            record_chunk_retry();
            warn!(
                offset,
                attempt = retries,
                delay_ms = delay.as_millis() as u64,
                "Chunk upload failed, resuming: {}",
                error
            );
            tokio::time::sleep(delay).await;

            match self.query_status(session, total).await {
                Ok(UploadState::Complete(id)) => {
                    self.report(total, total);
                    return Ok(id);
                }
                Ok(UploadState::Incomplete(next)) => {
                    debug!(offset = next, "Resuming upload");
                    offset = next;
                }
                Err(e) if e.is_retryable() || matches!(e, YoutubeError::TokenRejected(_)) => {
                    warn!("Upload status query failed, retrying from offset {}: {}", offset, e);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl Publisher for YoutubeUploader {
    async fn publish(&self, file: &Path, metadata: &UploadMetadata) -> YoutubeResult<String> {
        let size = match tokio::fs::metadata(file).await {
            Ok(m) => m.len(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(YoutubeError::FileNotFound(file.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };
        if size == 0 {
            return Err(YoutubeError::request_failed(format!("{} is empty", file.display())));
        }

        let title = publish_title(metadata, file);
        let span = info_span!("youtube_upload", title = %title, bytes = size);
        let start = Instant::now();

        let result = async {
            info!("Starting resumable upload");
            let session = self.start_session(&title, metadata, size).await?;
            let id = self.upload_file(&session, file, size).await?;
            info!(video_id = %id, "Upload complete: https://youtu.be/{}", id);
            Ok(id)
        }
        .instrument(span)
        .await;

        record_upload(result.is_ok(), start.elapsed().as_millis() as f64);
        result
    }
}

/// Cleaned title, falling back to the file stem when nothing is left.
pub fn publish_title(metadata: &UploadMetadata, file: &Path) -> String {
    let title = metadata.publish_title();
    if !title.is_empty() {
        return title;
    }
    let stem = file
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    clean_title(&stem)
}

/// Next byte offset from a `Range: bytes=0-N` header; no header means nothing
/// was stored yet.
fn next_offset(range: Option<&str>) -> u64 {
    range
        .and_then(|r| r.trim().strip_prefix("bytes="))
        .and_then(|r| r.split_once('-'))
        .and_then(|(_, last)| last.trim().parse::<u64>().ok())
        .map(|last| last + 1)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipcast_models::PrivacyStatus;
    use std::sync::Mutex;
    use tempfile::TempDir;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const KIB: u64 = 1024;

    async fn mount_token(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "ya29.test",
                "expires_in": 3600
            })))
            .mount(server)
            .await;
    }

    async fn mount_session(server: &MockServer, total: u64) {
        Mock::given(method("POST"))
            .and(path("/upload/youtube/v3/videos"))
            .and(query_param("uploadType", "resumable"))
            .and(query_param("part", "snippet,status"))
            .and(header("X-Upload-Content-Length", total.to_string().as_str()))
            .and(header("Authorization", "Bearer ya29.test"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Location", format!("{}/upload/session/abc", server.uri()).as_str()),
            )
            .expect(1)
            .mount(server)
            .await;
    }

    fn uploader(server: &MockServer) -> YoutubeUploader {
        let config = YoutubeConfig::default()
            .with_api_url(server.uri())
            .with_chunk_size(256 * KIB)
            .with_retry(RetryConfig {
                max_retries: 3,
                base_delay_ms: 1,
                max_delay_ms: 5,
            });
        let credentials =
            OAuthCredentials::new("cid", "secret", "refresh").with_token_uri(format!("{}/token", server.uri()));
        YoutubeUploader::new(config, credentials).unwrap()
    }

    fn video_file(dir: &TempDir, name: &str, len: u64) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, vec![7u8; len as usize]).unwrap();
        path
    }

    fn metadata(title: &str) -> UploadMetadata {
        UploadMetadata::new(title, "#shorts #twitch", vec!["shorts".into(), "twitch".into()])
    }

    #[test]
    fn test_next_offset() {
        assert_eq!(next_offset(Some("bytes=0-262143")), 262_144);
        assert_eq!(next_offset(None), 0);
        assert_eq!(next_offset(Some("garbage")), 0);
    }

    #[test]
    fn test_chunk_size_alignment() {
        assert_eq!(YoutubeConfig::default().chunk_size % CHUNK_ALIGNMENT, 0);
        assert_eq!(YoutubeConfig::default().with_chunk_size(1).chunk_size, CHUNK_ALIGNMENT);
        assert_eq!(YoutubeConfig::default().with_chunk_size(300 * KIB).chunk_size, 512 * KIB);
    }

    #[test]
    fn test_publish_title_fallbacks() {
        let file = Path::new("/tmp/shroud - ace_vertical.mp4");
        assert_eq!(publish_title(&metadata("Vertical insane clutch"), file), "insane clutch");
        assert_eq!(publish_title(&metadata("   "), file), "shroud - ace_vertical");
        assert_eq!(publish_title(&metadata(&"a".repeat(140)), file).chars().count(), 100);
    }

    #[tokio::test]
    async fn test_resumable_upload_in_chunks() {
        let server = MockServer::start().await;
        let total = 600 * KIB;
        mount_token(&server).await;

        Mock::given(method("POST"))
            .and(path("/upload/youtube/v3/videos"))
            .and(body_partial_json(json!({
                "snippet": {"title": "insane clutch", "tags": ["shorts", "twitch"], "categoryId": "20"},
                "status": {"privacyStatus": "unlisted"}
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Location", format!("{}/upload/session/abc", server.uri()).as_str()),
            )
            .expect(1)
            .mount(&server)
            .await;

        for (range, last) in [("bytes 0-262143/614400", 262_143), ("bytes 262144-524287/614400", 524_287)] {
            Mock::given(method("PUT"))
                .and(path("/upload/session/abc"))
                .and(header("Content-Range", range))
                .respond_with(ResponseTemplate::new(308).insert_header("Range", format!("bytes=0-{}", last).as_str()))
                .expect(1)
                .mount(&server)
                .await;
        }
        Mock::given(method("PUT"))
            .and(path("/upload/session/abc"))
            .and(header("Content-Range", "bytes 524288-614399/614400"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "xyz123", "kind": "youtube#video"})))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let file = video_file(&dir, "clip_vertical.mp4", total);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let uploader = uploader(&server).with_progress(Arc::new(move |p: UploadProgress| {
            sink.lock().unwrap().push(p.bytes_sent);
        }));

        let meta = metadata("VERTICAL insane clutch").with_privacy(PrivacyStatus::Unlisted);
        let id = uploader.publish(&file, &meta).await.unwrap();

        assert_eq!(id, "xyz123");
        assert_eq!(*seen.lock().unwrap(), vec![262_144, 524_288, 614_400]);
    }

    #[tokio::test]
    async fn test_resumes_after_server_error() {
        let server = MockServer::start().await;
        let total = 300 * KIB;
        mount_token(&server).await;
        mount_session(&server, total).await;

        Mock::given(method("PUT"))
            .and(path("/upload/session/abc"))
            .and(header("Content-Range", "bytes 0-262143/307200"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        // The server did store the first chunk before failing
        Mock::given(method("PUT"))
            .and(path("/upload/session/abc"))
            .and(header("Content-Range", "bytes */307200"))
            .respond_with(ResponseTemplate::new(308).insert_header("Range", "bytes=0-262143"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/upload/session/abc"))
            .and(header("Content-Range", "bytes 262144-307199/307200"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "resumed1"})))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let file = video_file(&dir, "clip.mp4", total);
        let id = uploader(&server).publish(&file, &metadata("clip")).await.unwrap();
        assert_eq!(id, "resumed1");
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let server = MockServer::start().await;
        let total = 100 * KIB;
        mount_token(&server).await;
        mount_session(&server, total).await;

        Mock::given(method("PUT"))
            .and(path("/upload/session/abc"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let file = video_file(&dir, "clip.mp4", total);
        let err = uploader(&server).publish(&file, &metadata("clip")).await.unwrap_err();
        assert!(matches!(err, YoutubeError::ServerError(500, _)));
    }

    #[tokio::test]
    async fn test_session_rejection_propagates() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("POST"))
            .and(path("/upload/youtube/v3/videos"))
            .respond_with(ResponseTemplate::new(403).set_body_string("quotaExceeded"))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let file = video_file(&dir, "clip.mp4", 10 * KIB);
        let err = uploader(&server).publish(&file, &metadata("clip")).await.unwrap_err();
        assert!(matches!(err, YoutubeError::AuthError(_)));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let server = MockServer::start().await;
        let err = uploader(&server)
            .publish(Path::new("/definitely/missing.mp4"), &metadata("clip"))
            .await
            .unwrap_err();
        assert!(matches!(err, YoutubeError::FileNotFound(_)));
    }
}
