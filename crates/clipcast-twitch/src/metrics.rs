//! Helix request metrics.

use metrics::{counter, histogram};

/// Metric name constants for consistency.
pub mod names {
    /// Total Helix requests by operation and status.
    pub const REQUESTS_TOTAL: &str = "twitch_requests_total";

    /// Request latency in seconds by operation.
    pub const LATENCY_SECONDS: &str = "twitch_latency_seconds";

    /// Token (re)authentications.
    pub const AUTHENTICATIONS_TOTAL: &str = "twitch_authentications_total";
}

/// Record metrics for a completed Helix request.
pub fn record_request(operation: &str, status: u16, latency_ms: f64) {
    counter!(
        names::REQUESTS_TOTAL,
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        names::LATENCY_SECONDS,
        "operation" => operation.to_string()
    )
    .record(latency_ms / 1000.0);
}

pub fn record_authentication() {
    counter!(names::AUTHENTICATIONS_TOTAL).increment(1);
}
