//! In-memory collaborators for worker tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use clipcast_bot::{BotResult, Notifier};
use clipcast_media::{clip_filename, vertical_output_path, Fetcher, MediaError, MediaResult, VerticalConverter};
use clipcast_models::{Clip, ClipId, UploadMetadata};
use clipcast_twitch::{ClipSelector, ClipSource, TwitchError, TwitchResult};
use clipcast_worker::{ManualTrigger, Orchestrator, Pipeline, StatusBoard, WorkerConfig};
use clipcast_youtube::{Publisher, YoutubeError, YoutubeResult};

pub fn clip(id: &str, channel: &str, views: u64) -> Clip {
    Clip {
        id: ClipId::from(id),
        title: format!("Vertical {} highlight", id),
        broadcaster_name: channel.to_string(),
        channel: channel.to_string(),
        view_count: views,
        url: format!("https://clips.twitch.tv/{}", id),
        created_at: None,
    }
}

/// Channel listings keyed by login.
#[derive(Default)]
pub struct FakeSource {
    pub clips: HashMap<String, Vec<Clip>>,
    pub failing: bool,
}

impl FakeSource {
    pub fn with_clips(clips: Vec<Clip>) -> Self {
        let mut source = Self::default();
        for clip in clips {
            source.clips.entry(clip.channel.clone()).or_default().push(clip);
        }
        source
    }
}

#[async_trait]
impl ClipSource for FakeSource {
    async fn resolve_channel(&self, login: &str) -> TwitchResult<Option<String>> {
        if self.failing {
            return Err(TwitchError::from_http_status(503, "helix unavailable"));
        }
        Ok(self.clips.contains_key(login).then(|| format!("id-{}", login)))
    }

    async fn recent_clips(&self, broadcaster_id: &str, channel: &str) -> TwitchResult<Vec<Clip>> {
        assert_eq!(broadcaster_id, format!("id-{}", channel));
        Ok(self.clips.get(channel).cloned().unwrap_or_default())
    }
}

/// Writes a small file in place of a real download.
#[derive(Default)]
pub struct FakeFetcher {
    pub fail: bool,
    pub downloads: Mutex<Vec<PathBuf>>,
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn download(&self, clip: &Clip, destination_dir: &Path) -> MediaResult<PathBuf> {
        if self.fail {
            return Err(MediaError::download_failed("yt-dlp exited with status 1"));
        }
        let path = destination_dir.join(clip_filename(clip));
        tokio::fs::write(&path, b"source").await?;
        self.downloads.lock().unwrap().push(path.clone());
        Ok(path)
    }
}

/// Writes the vertical output next to the source after `delay`, tracking
/// how many conversions overlap.
#[derive(Default)]
pub struct FakeConverter {
    pub fail: bool,
    pub delay: Duration,
    pub active: AtomicUsize,
    pub max_active: AtomicUsize,
}

impl FakeConverter {
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Default::default()
        }
    }

    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VerticalConverter for FakeConverter {
    async fn convert_to_vertical(&self, source: &Path) -> MediaResult<PathBuf> {
        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now_active, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.active.fetch_sub(1, Ordering::SeqCst);

        if self.fail {
            return Err(MediaError::source_unavailable("source has no decodable frames"));
        }
        let output = vertical_output_path(source);
        tokio::fs::write(&output, b"vertical").await?;
        Ok(output)
    }
}

/// Records uploads and answers with a fixed id.
pub struct FakePublisher {
    pub remote_id: String,
    pub fail: bool,
    pub uploads: Mutex<Vec<(PathBuf, String)>>,
}

impl Default for FakePublisher {
    fn default() -> Self {
        Self {
            remote_id: "xyz123".to_string(),
            fail: false,
            uploads: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Publisher for FakePublisher {
    async fn publish(&self, file: &Path, metadata: &UploadMetadata) -> YoutubeResult<String> {
        if self.fail {
            return Err(YoutubeError::from_http_status(403, "quotaExceeded"));
        }
        assert!(file.exists(), "published file must exist");
        self.uploads
            .lock()
            .unwrap()
            .push((file.to_path_buf(), metadata.publish_title()));
        Ok(self.remote_id.clone())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub messages: Mutex<Vec<String>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, text: &str) -> BotResult<()> {
        self.messages.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

/// A pipeline over fakes rooted in a temp dir.
pub struct Harness {
    pub dir: TempDir,
    pub config: WorkerConfig,
    pub fetcher: Arc<FakeFetcher>,
    pub converter: Arc<FakeConverter>,
    pub publisher: Arc<FakePublisher>,
    pub pipeline: Arc<Pipeline>,
}

impl Harness {
    pub fn new(source: FakeSource, fetcher: FakeFetcher, converter: FakeConverter, publisher: FakePublisher) -> Self {
        let dir = TempDir::new().unwrap();
        let config = WorkerConfig {
            channels: vec!["chanA".to_string()],
            output_dir: dir.path().join("processed"),
            ledger_path: dir.path().join("memory.json"),
            trigger_state_path: dir.path().join("bot_state.json"),
            ..WorkerConfig::default()
        };
        let fetcher = Arc::new(fetcher);
        let converter = Arc::new(converter);
        let publisher = Arc::new(publisher);
        let pipeline = Arc::new(Pipeline::new(
            config.clone(),
            ClipSelector::new(Arc::new(source)),
            fetcher.clone(),
            converter.clone(),
            publisher.clone(),
        ));

        Self {
            dir,
            config,
            fetcher,
            converter,
            publisher,
            pipeline,
        }
    }

    /// Default fakes with the given clips.
    pub fn with_clips(clips: Vec<Clip>) -> Self {
        Self::new(
            FakeSource::with_clips(clips),
            FakeFetcher::default(),
            FakeConverter::default(),
            FakePublisher::default(),
        )
    }

    pub fn orchestrator(&self, notifier: Arc<RecordingNotifier>) -> (Orchestrator, Arc<ManualTrigger>, Arc<StatusBoard>) {
        let trigger = Arc::new(ManualTrigger::in_memory());
        let status = Arc::new(StatusBoard::new());
        let orchestrator = Orchestrator::new(self.pipeline.clone(), trigger.clone(), status.clone(), notifier);
        (orchestrator, trigger, status)
    }

    pub fn ledger_ids(&self) -> Vec<String> {
        match std::fs::read_to_string(&self.config.ledger_path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap(),
            Err(_) => Vec::new(),
        }
    }

    pub fn output_files(&self) -> Vec<PathBuf> {
        match std::fs::read_dir(&self.config.output_dir) {
            Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
            Err(_) => Vec::new(),
        }
    }
}

/// Poll `check` until it holds or two seconds pass.
pub async fn eventually(mut check: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !check() {
        assert!(tokio::time::Instant::now() < deadline, "condition not met in time");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
