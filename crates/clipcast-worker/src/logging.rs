//! Structured cycle logging utilities.
//!
//! Provides consistent, structured logging for orchestrator cycles with
//! tracing spans and contextual information.

use tracing::{error, info, warn, Span};

use clipcast_models::{CycleId, CycleState, TriggerKind};

/// Cycle logger for structured logging with consistent formatting.
///
/// Every line carries the cycle id and what triggered the cycle.
#[derive(Debug, Clone)]
pub struct CycleLogger {
    cycle_id: CycleId,
    trigger: TriggerKind,
}

impl CycleLogger {
    pub fn new(cycle_id: CycleId, trigger: TriggerKind) -> Self {
        Self { cycle_id, trigger }
    }

    /// Log the start of a cycle.
    pub fn log_start(&self, message: &str) {
        info!(
            cycle_id = %self.cycle_id,
            trigger = %self.trigger,
            "Cycle started: {}", message
        );
    }

    /// Log entry into a pipeline stage.
    pub fn log_stage(&self, stage: CycleState, message: &str) {
        info!(
            cycle_id = %self.cycle_id,
            trigger = %self.trigger,
            stage = %stage,
            "{}", message
        );
    }

    /// Log a progress update during the cycle.
    pub fn log_progress(&self, message: &str) {
        info!(
            cycle_id = %self.cycle_id,
            trigger = %self.trigger,
            "Cycle progress: {}", message
        );
    }

    /// Log a warning during the cycle.
    pub fn log_warning(&self, message: &str) {
        warn!(
            cycle_id = %self.cycle_id,
            trigger = %self.trigger,
            "Cycle warning: {}", message
        );
    }

    /// Log an error during the cycle.
    pub fn log_error(&self, stage: CycleState, message: &str) {
        error!(
            cycle_id = %self.cycle_id,
            trigger = %self.trigger,
            stage = %stage,
            "Cycle error: {}", message
        );
    }

    /// Log the completion of a cycle.
    pub fn log_completion(&self, message: &str) {
        info!(
            cycle_id = %self.cycle_id,
            trigger = %self.trigger,
            "Cycle completed: {}", message
        );
    }

    pub fn cycle_id(&self) -> &CycleId {
        &self.cycle_id
    }

    pub fn trigger(&self) -> TriggerKind {
        self.trigger
    }

    /// Create a tracing span for this cycle.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "cycle",
            cycle_id = %self.cycle_id,
            trigger = %self.trigger
        )
    }
}
