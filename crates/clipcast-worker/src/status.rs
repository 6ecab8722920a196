//! Read-only status snapshot for the chat surface.

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::warn;

use clipcast_models::{CycleId, CycleOutcome, CycleState, TriggerKind};

/// Point-in-time orchestrator status.
#[derive(Debug, Clone, Default)]
pub struct StatusSnapshot {
    pub state: CycleState,
    pub current_cycle: Option<(CycleId, TriggerKind)>,
    /// Clip being processed, once selected
    pub current_clip: Option<String>,
    pub last_outcome: Option<CycleOutcome>,
    pub last_finished_at: Option<DateTime<Utc>>,
    pub next_run_at: Option<DateTime<Utc>>,
}

impl StatusSnapshot {
    /// Human-readable report.
    pub fn render(&self, manual_pending: bool) -> String {
        let mut lines = Vec::new();

        match (&self.current_cycle, self.state.is_busy()) {
            (Some((_, trigger)), true) => {
                let clip = self.current_clip.as_deref().unwrap_or("-");
                lines.push(format!("Running a {} cycle: {} ({})", trigger, self.state, clip));
            }
            _ => lines.push("Idle, waiting for the next run.".to_string()),
        }

        if manual_pending {
            lines.push("A manual run is pending.".to_string());
        }

        if let Some(next) = self.next_run_at {
            lines.push(format!("Next scheduled run: {}", next.format("%Y-%m-%d %H:%M UTC")));
        }

        match (&self.last_outcome, self.last_finished_at) {
            (Some(outcome), Some(at)) => {
                lines.push(format!("Last cycle ({}): {}", at.format("%Y-%m-%d %H:%M UTC"), describe(outcome)));
            }
            _ => lines.push("No cycle has finished yet.".to_string()),
        }

        lines.join("\n")
    }
}

/// Short description of a cycle outcome.
pub fn describe(outcome: &CycleOutcome) -> String {
    match outcome {
        CycleOutcome::Published { clip_id, remote_id } => {
            format!("published {} as https://youtu.be/{}", clip_id, remote_id)
        }
        CycleOutcome::NothingNew => "no new clips".to_string(),
        CycleOutcome::Failed { stage, message } => format!("failed while {}: {}", stage, message),
    }
}

/// Shared status, written by the orchestrator and read by commands.
#[derive(Debug, Default)]
pub struct StatusBoard {
    inner: RwLock<StatusSnapshot>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> StatusSnapshot {
        self.inner.read().await.clone()
    }

    pub async fn state(&self) -> CycleState {
        self.inner.read().await.state
    }

    /// Move to `next`; illegal transitions are logged and applied anyway.
    pub async fn transition(&self, next: CycleState) {
        let mut inner = self.inner.write().await;
        if !inner.state.can_transition_to(next) {
            warn!(from = %inner.state, to = %next, "Unexpected cycle state transition");
        }
        inner.state = next;
    }

    pub async fn begin_cycle(&self, cycle_id: CycleId, trigger: TriggerKind) {
        let mut inner = self.inner.write().await;
        inner.current_cycle = Some((cycle_id, trigger));
        inner.current_clip = None;
    }

    pub async fn set_current_clip(&self, clip: impl Into<String>) {
        self.inner.write().await.current_clip = Some(clip.into());
    }

    /// Record the outcome and return to `Idle`.
    pub async fn finish_cycle(&self, outcome: CycleOutcome) {
        let mut inner = self.inner.write().await;
        inner.state = CycleState::Idle;
        inner.current_cycle = None;
        inner.current_clip = None;
        inner.last_outcome = Some(outcome);
        inner.last_finished_at = Some(Utc::now());
    }

    pub async fn set_next_run(&self, at: Option<DateTime<Utc>>) {
        self.inner.write().await.next_run_at = at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipcast_models::ClipId;

    #[tokio::test]
    async fn test_cycle_lifecycle() {
        let board = StatusBoard::new();
        board.begin_cycle(CycleId::new(), TriggerKind::Manual).await;
        board.transition(CycleState::Selecting).await;
        board.set_current_clip("ace (300 views)").await;

        let report = board.snapshot().await.render(false);
        assert!(report.contains("Running a manual cycle: selecting (ace (300 views))"));
        assert!(report.contains("No cycle has finished yet."));

        board
            .finish_cycle(CycleOutcome::Published {
                clip_id: ClipId::from("xyz"),
                remote_id: "abc".to_string(),
            })
            .await;

        let snapshot = board.snapshot().await;
        assert_eq!(snapshot.state, CycleState::Idle);
        let report = snapshot.render(true);
        assert!(report.starts_with("Idle"));
        assert!(report.contains("A manual run is pending."));
        assert!(report.contains("published xyz as https://youtu.be/abc"));
    }

    #[test]
    fn test_describe_failure() {
        let outcome = CycleOutcome::Failed {
            stage: CycleState::Downloading,
            message: "yt-dlp exited with 1".to_string(),
        };
        assert_eq!(describe(&outcome), "failed while downloading: yt-dlp exited with 1");
    }
}
