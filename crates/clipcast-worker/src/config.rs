//! Worker configuration.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clipcast_models::{PrivacyStatus, UploadMetadata};

/// Longest accepted `RUN_INTERVAL_HOURS` (ten years).
const MAX_INTERVAL_HOURS: f64 = 24.0 * 365.0 * 10.0;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Channel logins searched for clips
    pub channels: Vec<String>,
    /// Idle time between scheduled cycles
    pub run_interval: Duration,
    /// Run one cycle right after startup
    pub run_on_startup: bool,
    /// Download and conversion directory
    pub output_dir: PathBuf,
    /// Dedup ledger file
    pub ledger_path: PathBuf,
    /// Persisted manual-run flag
    pub trigger_state_path: PathBuf,
    pub upload_description: String,
    pub upload_tags: Vec<String>,
    pub upload_privacy: PrivacyStatus,
    /// YuNet ONNX model; `None` selects the centered fallback
    pub face_model_path: Option<PathBuf>,
    /// Prometheus exporter listen address
    pub metrics_addr: Option<SocketAddr>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            channels: vec!["shroud".to_string(), "xqc".to_string()],
            run_interval: Duration::from_secs(12 * 3600),
            run_on_startup: true,
            output_dir: PathBuf::from("processed"),
            ledger_path: PathBuf::from("memory.json"),
            trigger_state_path: PathBuf::from("bot_state.json"),
            upload_description: "#shorts #twitch".to_string(),
            upload_tags: vec!["shorts".to_string(), "twitch".to_string()],
            upload_privacy: PrivacyStatus::Public,
            face_model_path: None,
            metrics_addr: None,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            channels: env_var("CHANNELS")
                .map(|v| parse_list(&v))
                .filter(|list| !list.is_empty())
                .unwrap_or(defaults.channels),
            run_interval: env_var("RUN_INTERVAL_HOURS")
                .and_then(|v| v.trim().parse::<f64>().ok())
                .filter(|h| h.is_finite() && *h > 0.0 && *h <= MAX_INTERVAL_HOURS)
                .map(|h| Duration::from_secs_f64(h * 3600.0))
                .unwrap_or(defaults.run_interval),
            run_on_startup: env_var("RUN_ON_STARTUP")
                .and_then(|v| parse_bool(&v))
                .unwrap_or(defaults.run_on_startup),
            output_dir: env_var("OUTPUT_DIR").map(PathBuf::from).unwrap_or(defaults.output_dir),
            ledger_path: env_var("LEDGER_PATH").map(PathBuf::from).unwrap_or(defaults.ledger_path),
            trigger_state_path: env_var("TRIGGER_STATE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.trigger_state_path),
            upload_description: env_var("UPLOAD_DESCRIPTION").unwrap_or(defaults.upload_description),
            upload_tags: env_var("UPLOAD_TAGS")
                .map(|v| parse_list(&v))
                .unwrap_or(defaults.upload_tags),
            upload_privacy: env_var("UPLOAD_PRIVACY")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.upload_privacy),
            face_model_path: env_var("FACE_MODEL_PATH").map(PathBuf::from),
            metrics_addr: env_var("METRICS_ADDR").and_then(|v| v.trim().parse().ok()),
        }
    }

    /// Upload metadata for a clip title.
    pub fn upload_metadata(&self, title: &str) -> UploadMetadata {
        UploadMetadata::new(title, self.upload_description.clone(), self.upload_tags.clone())
            .with_privacy(self.upload_privacy)
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Split a comma-separated list, dropping blanks.
pub fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
