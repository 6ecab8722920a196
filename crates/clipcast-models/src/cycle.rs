//! Pipeline cycle identifiers, states and outcomes.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::ClipId;

/// Unique identifier for one orchestrator cycle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct CycleId(pub String);

impl CycleId {
    /// Generate a new random cycle ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CycleId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CycleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What started a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    /// Interval timer elapsed (or startup run)
    Scheduled,
    /// Manual-run flag set through the chat command
    Manual,
}

impl TriggerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerKind::Scheduled => "scheduled",
            TriggerKind::Manual => "manual",
        }
    }
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Orchestrator state.
///
/// `Idle -> Selecting -> Downloading -> Converting -> Publishing -> Recording -> Idle`,
/// with `Failed` reachable from the four middle stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum CycleState {
    #[default]
    Idle,
    Selecting,
    Downloading,
    Converting,
    Publishing,
    Recording,
    Failed,
}

impl CycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CycleState::Idle => "idle",
            CycleState::Selecting => "selecting",
            CycleState::Downloading => "downloading",
            CycleState::Converting => "converting",
            CycleState::Publishing => "publishing",
            CycleState::Recording => "recording",
            CycleState::Failed => "failed",
        }
    }

    /// True while a cycle is in flight.
    pub fn is_busy(&self) -> bool {
        !matches!(self, CycleState::Idle | CycleState::Failed)
    }

    /// Whether moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(&self, next: CycleState) -> bool {
        use CycleState::*;
        matches!(
            (self, next),
            (Idle, Selecting)
                | (Selecting, Downloading)
                | (Selecting, Idle)
                | (Downloading, Converting)
                | (Converting, Publishing)
                | (Publishing, Recording)
                | (Recording, Idle)
                | (Selecting, Failed)
                | (Downloading, Failed)
                | (Converting, Failed)
                | (Publishing, Failed)
                | (Failed, Idle)
        )
    }
}

impl fmt::Display for CycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a finished cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CycleOutcome {
    /// A clip was published and recorded.
    Published { clip_id: ClipId, remote_id: String },
    /// No unseen clip was available.
    NothingNew,
    /// A stage failed; the cycle was abandoned.
    Failed { stage: CycleState, message: String },
}

impl CycleOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            CycleOutcome::Published { .. } => "published",
            CycleOutcome::NothingNew => "nothing_new",
            CycleOutcome::Failed { .. } => "failed",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, CycleOutcome::Failed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        let path = [
            CycleState::Idle,
            CycleState::Selecting,
            CycleState::Downloading,
            CycleState::Converting,
            CycleState::Publishing,
            CycleState::Recording,
            CycleState::Idle,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_recording_cannot_fail() {
        assert!(!CycleState::Recording.can_transition_to(CycleState::Failed));
        assert!(!CycleState::Idle.can_transition_to(CycleState::Failed));
    }

    #[test]
    fn test_busy_states() {
        assert!(!CycleState::Idle.is_busy());
        assert!(CycleState::Converting.is_busy());
        assert!(!CycleState::Failed.is_busy());
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = CycleOutcome::Failed {
            stage: CycleState::Downloading,
            message: "yt-dlp exited with 1".to_string(),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["outcome"], "failed");
        assert_eq!(json["stage"], "downloading");
    }
}
