//! Upload metrics.

use metrics::{counter, histogram};

/// Metric name constants for consistency.
pub mod names {
    /// Completed uploads by result.
    pub const UPLOADS_TOTAL: &str = "youtube_uploads_total";

    /// Bytes acknowledged by the upload endpoint.
    pub const UPLOADED_BYTES_TOTAL: &str = "youtube_uploaded_bytes_total";

    /// Chunk retries after transient failures.
    pub const CHUNK_RETRIES_TOTAL: &str = "youtube_chunk_retries_total";

    /// Wall time of a whole upload in seconds.
    pub const UPLOAD_SECONDS: &str = "youtube_upload_seconds";
}

pub fn record_upload(success: bool, latency_ms: f64) {
    let result = if success { "success" } else { "error" };
    counter!(names::UPLOADS_TOTAL, "result" => result).increment(1);
    histogram!(names::UPLOAD_SECONDS, "result" => result).record(latency_ms / 1000.0);
}

pub fn record_bytes(bytes: u64) {
    counter!(names::UPLOADED_BYTES_TOTAL).increment(bytes);
}

pub fn record_chunk_retry() {
    counter!(names::CHUNK_RETRIES_TOTAL).increment(1);
}
