//! Worker error types.

use thiserror::Error;

use clipcast_media::MediaError;
use clipcast_models::CycleState;
use clipcast_twitch::TwitchError;
use clipcast_youtube::YoutubeError;

pub type WorkerResult<T> = Result<T, WorkerError>;

/// A cycle failure, tagged with the stage it came from.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Clip selection failed: {0}")]
    Selection(#[from] TwitchError),

    #[error("Download failed: {0}")]
    Download(#[source] MediaError),

    #[error("Conversion failed: {0}")]
    Conversion(#[source] MediaError),

    #[error("Publish failed: {0}")]
    Publish(#[from] YoutubeError),

    #[error("Ledger error: {0}")]
    Ledger(String),
}

impl WorkerError {
    pub fn ledger(msg: impl Into<String>) -> Self {
        Self::Ledger(msg.into())
    }

    /// Stage to report for this failure.
    pub fn stage(&self) -> CycleState {
        match self {
            WorkerError::Selection(_) => CycleState::Selecting,
            WorkerError::Download(_) => CycleState::Downloading,
            WorkerError::Conversion(_) => CycleState::Converting,
            WorkerError::Publish(_) => CycleState::Publishing,
            WorkerError::Ledger(_) => CycleState::Recording,
        }
    }
}
