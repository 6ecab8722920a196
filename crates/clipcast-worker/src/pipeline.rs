//! One clip-to-Shorts cycle.
//!
//! Stages run strictly in sequence:
//! `Selecting -> Downloading -> Converting -> Publishing -> Recording`.
//! A failure in any of the first four abandons the cycle; files produced so
//! far are left in the output directory.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clipcast_media::{remove_files_best_effort, Fetcher, MediaError, VerticalConverter};
use clipcast_models::{Clip, CycleOutcome, CycleState};
use clipcast_twitch::ClipSelector;
use clipcast_youtube::Publisher;

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::ledger::DedupLedger;
use crate::logging::CycleLogger;
use crate::metrics::{record_stage_duration, set_ledger_entries};
use crate::status::StatusBoard;

/// The collaborators of a cycle.
pub struct Pipeline {
    config: WorkerConfig,
    selector: ClipSelector,
    fetcher: Arc<dyn Fetcher>,
    converter: Arc<dyn VerticalConverter>,
    publisher: Arc<dyn Publisher>,
}

impl Pipeline {
    pub fn new(
        config: WorkerConfig,
        selector: ClipSelector,
        fetcher: Arc<dyn Fetcher>,
        converter: Arc<dyn VerticalConverter>,
        publisher: Arc<dyn Publisher>,
    ) -> Self {
        Self {
            config,
            selector,
            fetcher,
            converter,
            publisher,
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Run one cycle to completion. Never fails; failures become
    /// [`CycleOutcome::Failed`].
    pub async fn run_cycle(&self, logger: &CycleLogger, status: &StatusBoard) -> CycleOutcome {
        logger.log_start(&format!("channels {}", self.config.channels.join(",")));

        match self.execute(logger, status).await {
            Ok(Some(outcome)) => outcome,
            Ok(None) => {
                logger.log_completion("no new clips");
                CycleOutcome::NothingNew
            }
            Err(e) => {
                let stage = e.stage();
                logger.log_error(stage, &e.to_string());
                status.transition(CycleState::Failed).await;
                CycleOutcome::Failed {
                    stage,
                    message: e.to_string(),
                }
            }
        }
    }

    async fn execute(&self, logger: &CycleLogger, status: &StatusBoard) -> WorkerResult<Option<CycleOutcome>> {
        status.transition(CycleState::Selecting).await;
        let mut ledger = DedupLedger::load(&self.config.ledger_path).await;
        set_ledger_entries(ledger.len());

        let selected = timed(
            CycleState::Selecting,
            self.selector.select_best(&self.config.channels, ledger.ids()),
        )
        .await?;
        let Some(clip) = selected else {
            status.transition(CycleState::Idle).await;
            return Ok(None);
        };

        status.set_current_clip(clip.summary()).await;
        logger.log_progress(&format!("selected {} [{}] from {}", clip.summary(), clip.id, clip.channel));

        status.transition(CycleState::Downloading).await;
        logger.log_stage(CycleState::Downloading, &clip.url);
        let source = timed(CycleState::Downloading, self.download(&clip))
            .await
            .map_err(WorkerError::Download)?;

        status.transition(CycleState::Converting).await;
        logger.log_stage(CycleState::Converting, &source.display().to_string());
        let vertical = timed(CycleState::Converting, self.converter.convert_to_vertical(&source))
            .await
            .map_err(|e| {
                if e.is_source_unavailable() {
                    // The fetcher reuses existing files, so a broken source sticks around
                    logger.log_warning(&format!(
                        "{} is unreadable; remove it to download the clip again",
                        source.display()
                    ));
                }
                WorkerError::Conversion(e)
            })?;

        status.transition(CycleState::Publishing).await;
        logger.log_stage(CycleState::Publishing, &vertical.display().to_string());
        let metadata = self.config.upload_metadata(&clip.title);
        let remote_id = timed(CycleState::Publishing, self.publisher.publish(&vertical, &metadata)).await?;
        logger.log_progress(&format!("published as {}", remote_id));

        status.transition(CycleState::Recording).await;
        self.record(logger, &mut ledger, &clip, &[source, vertical]).await;

        logger.log_completion(&format!("{} -> {}", clip.id, remote_id));
        Ok(Some(CycleOutcome::Published {
            clip_id: clip.id,
            remote_id,
        }))
    }

    async fn download(&self, clip: &Clip) -> Result<PathBuf, MediaError> {
        tokio::fs::create_dir_all(&self.config.output_dir).await?;
        self.fetcher.download(clip, &self.config.output_dir).await
    }

    /// Add the clip to the ledger and remove its files.
    ///
    /// The clip is already live at this point, so neither step can fail the
    /// cycle.
    async fn record(&self, logger: &CycleLogger, ledger: &mut DedupLedger, clip: &Clip, files: &[PathBuf]) {
        ledger.insert(clip.id.clone());
        if let Err(e) = ledger.save().await {
            logger.log_error(
                CycleState::Recording,
                &format!("{}; clip {} may be published again", e, clip.id),
            );
        }
        set_ledger_entries(ledger.len());

        let failures = remove_files_best_effort(files.iter().map(PathBuf::as_path)).await;
        if failures > 0 {
            logger.log_warning(&format!("{} file(s) could not be removed", failures));
        }
    }
}

async fn timed<T, E, F>(stage: CycleState, fut: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
{
    let started = Instant::now();
    let result = fut.await;
    record_stage_duration(stage, result.is_ok(), started.elapsed().as_secs_f64());
    result
}
