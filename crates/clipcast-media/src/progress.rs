//! FFmpeg `-progress` snapshots.

/// Latest values from one `-progress` block.
#[derive(Debug, Clone, Default)]
pub struct FfmpegProgress {
    pub frame: u64,
    /// Output position in milliseconds
    pub out_time_ms: i64,
    /// Encoding speed relative to realtime
    pub speed: f64,
    /// Set by the final `progress=end` block
    pub is_complete: bool,
}

impl FfmpegProgress {
    /// Percent of `total_duration_ms` written so far, clamped to 0..=100.
    pub fn percentage(&self, total_duration_ms: i64) -> f64 {
        match (self.is_complete, total_duration_ms) {
            (true, _) => 100.0,
            (false, total) if total <= 0 => 0.0,
            (false, total) => (self.out_time_ms as f64 * 100.0 / total as f64).clamp(0.0, 100.0),
        }
    }
}
