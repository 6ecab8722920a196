//! Run orchestrator.
//!
//! Waits in `Idle` for the interval timer or the manual trigger, whichever
//! comes first, and runs one cycle at a time. A manual request made while a
//! cycle is running stays pending and fires after it.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{info, warn, Instrument};

use clipcast_bot::Notifier;
use clipcast_models::{CycleId, CycleOutcome, TriggerKind};

use crate::logging::CycleLogger;
use crate::metrics::record_cycle;
use crate::pipeline::Pipeline;
use crate::status::{describe, StatusBoard};
use crate::trigger::ManualTrigger;

/// Sequences cycles on a timer and on demand.
pub struct Orchestrator {
    pipeline: Arc<Pipeline>,
    trigger: Arc<ManualTrigger>,
    status: Arc<StatusBoard>,
    notifier: Arc<dyn Notifier>,
}

impl Orchestrator {
    pub fn new(
        pipeline: Arc<Pipeline>,
        trigger: Arc<ManualTrigger>,
        status: Arc<StatusBoard>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            pipeline,
            trigger,
            status,
            notifier,
        }
    }

    /// Loop until shutdown. A running cycle is always finished first.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let interval = self.pipeline.config().run_interval;
        let mut next_run = if self.pipeline.config().run_on_startup {
            Instant::now()
        } else {
            Instant::now() + interval
        };

        info!(
            interval_secs = interval.as_secs(),
            run_on_startup = self.pipeline.config().run_on_startup,
            "Starting orchestrator"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let trigger = if self.trigger.take().await {
                TriggerKind::Manual
            } else if Instant::now() >= next_run {
                TriggerKind::Scheduled
            } else {
                self.publish_next_run(next_run).await;
                tokio::select! {
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                    _ = tokio::time::sleep_until(next_run) => {}
                    _ = self.trigger.wait() => {}
                }
                continue;
            };

            self.run_cycle(trigger).await;

            // Manual runs leave the schedule alone
            if trigger == TriggerKind::Scheduled {
                next_run = Instant::now() + interval;
            }
        }

        info!("Orchestrator stopped");
    }

    /// Run a single cycle and report its outcome.
    pub async fn run_cycle(&self, trigger: TriggerKind) -> CycleOutcome {
        let logger = CycleLogger::new(CycleId::new(), trigger);
        self.status.begin_cycle(logger.cycle_id().clone(), trigger).await;

        if trigger == TriggerKind::Manual {
            self.relay("Manual cycle started by /make").await;
        }

        let outcome = self
            .pipeline
            .run_cycle(&logger, &self.status)
            .instrument(logger.create_span())
            .await;

        record_cycle(trigger, &outcome);
        self.status.finish_cycle(outcome.clone()).await;

        if trigger == TriggerKind::Manual {
            self.relay(&manual_report(&outcome)).await;
        }

        outcome
    }

    async fn relay(&self, text: &str) {
        if let Err(e) = self.notifier.notify(text).await {
            warn!("Failed to relay cycle report: {}", e);
        }
    }

    async fn publish_next_run(&self, next_run: Instant) {
        let remaining = next_run.saturating_duration_since(Instant::now());
        let at = chrono::Duration::from_std(remaining).ok().map(|d| Utc::now() + d);
        self.status.set_next_run(at).await;
    }
}

/// Chat message for a finished manual cycle.
pub fn manual_report(outcome: &CycleOutcome) -> String {
    match outcome {
        CycleOutcome::Published { remote_id, .. } => {
            format!("Video uploaded: https://youtu.be/{}", remote_id)
        }
        CycleOutcome::NothingNew => "No new clips to publish.".to_string(),
        CycleOutcome::Failed { .. } => format!("Manual cycle failed: {}", describe(outcome)),
    }
}
