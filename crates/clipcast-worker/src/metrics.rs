//! Cycle metrics.

use std::net::SocketAddr;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use clipcast_models::{CycleOutcome, CycleState, TriggerKind};

/// Metric names as constants for consistency.
pub mod names {
    pub const CYCLES_TOTAL: &str = "clipcast_cycles_total";
    pub const STAGE_DURATION_SECONDS: &str = "clipcast_stage_duration_seconds";
    pub const LEDGER_ENTRIES: &str = "clipcast_ledger_entries";
    pub const MANUAL_TRIGGERS_TOTAL: &str = "clipcast_manual_triggers_total";
}

/// Serve Prometheus metrics on `addr`.
pub fn init_exporter(addr: SocketAddr) -> Result<(), metrics_exporter_prometheus::BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()
}

/// Record a finished cycle.
pub fn record_cycle(trigger: TriggerKind, outcome: &CycleOutcome) {
    let labels = [
        ("trigger", trigger.as_str().to_string()),
        ("outcome", outcome.label().to_string()),
    ];
    counter!(names::CYCLES_TOTAL, &labels).increment(1);
}

/// Record time spent in one stage.
pub fn record_stage_duration(stage: CycleState, success: bool, duration_secs: f64) {
    let labels = [
        ("stage", stage.as_str().to_string()),
        ("result", if success { "success" } else { "error" }.to_string()),
    ];
    histogram!(names::STAGE_DURATION_SECONDS, &labels).record(duration_secs);
}

pub fn set_ledger_entries(count: usize) {
    gauge!(names::LEDGER_ENTRIES).set(count as f64);
}

pub fn record_manual_trigger() {
    counter!(names::MANUAL_TRIGGERS_TOTAL).increment(1);
}
