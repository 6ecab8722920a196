//! Cycle pipeline tests over in-memory collaborators.

mod common;

use clipcast_models::{ClipId, CycleId, CycleOutcome, CycleState, TriggerKind};
use clipcast_worker::{CycleLogger, StatusBoard};

use common::{clip, FakeConverter, FakeFetcher, FakePublisher, FakeSource, Harness};

async fn run(harness: &Harness) -> (CycleOutcome, StatusBoard) {
    let status = StatusBoard::new();
    let logger = CycleLogger::new(CycleId::new(), TriggerKind::Scheduled);
    let outcome = harness.pipeline.run_cycle(&logger, &status).await;
    (outcome, status)
}

#[tokio::test]
async fn test_end_to_end_publish_records_and_cleans_up() {
    let harness = Harness::with_clips(vec![clip("clip-300", "chanA", 300)]);

    let (outcome, _) = run(&harness).await;

    assert_eq!(
        outcome,
        CycleOutcome::Published {
            clip_id: ClipId::from("clip-300"),
            remote_id: "xyz123".to_string(),
        }
    );
    assert_eq!(harness.ledger_ids(), vec!["clip-300"]);
    assert!(harness.output_files().is_empty(), "left behind: {:?}", harness.output_files());

    let uploads = harness.publisher.uploads.lock().unwrap();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].1, "clip-300 highlight");
    assert!(uploads[0].0.to_string_lossy().ends_with("_vertical.mp4"));
}

#[tokio::test]
async fn test_second_cycle_finds_nothing_new() {
    let harness = Harness::with_clips(vec![clip("only", "chanA", 10)]);

    let (first, _) = run(&harness).await;
    assert!(matches!(first, CycleOutcome::Published { .. }));

    let (second, status) = run(&harness).await;
    assert_eq!(second, CycleOutcome::NothingNew);
    assert_eq!(status.state().await, CycleState::Idle);
    assert_eq!(harness.ledger_ids(), vec!["only"]);
    assert_eq!(harness.publisher.uploads.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_highest_viewed_unseen_clip_is_chosen() {
    let harness = Harness::with_clips(vec![
        clip("a", "chanA", 50),
        clip("b", "chanA", 200),
        clip("c", "chanA", 120),
    ]);
    std::fs::write(&harness.config.ledger_path, r#"["b"]"#).unwrap();

    let (outcome, _) = run(&harness).await;

    assert!(matches!(outcome, CycleOutcome::Published { ref clip_id, .. } if clip_id.as_str() == "c"));
    assert_eq!(harness.ledger_ids(), vec!["b", "c"]);
}

#[tokio::test]
async fn test_corrupt_ledger_is_treated_as_empty() {
    let harness = Harness::with_clips(vec![clip("fresh", "chanA", 5)]);
    std::fs::write(&harness.config.ledger_path, "not json at all").unwrap();

    let (outcome, _) = run(&harness).await;

    assert!(matches!(outcome, CycleOutcome::Published { .. }));
    assert_eq!(harness.ledger_ids(), vec!["fresh"]);
}

#[tokio::test]
async fn test_selection_failure() {
    let source = FakeSource {
        failing: true,
        ..FakeSource::default()
    };
    let harness = Harness::new(source, FakeFetcher::default(), FakeConverter::default(), FakePublisher::default());

    let (outcome, status) = run(&harness).await;

    assert!(matches!(outcome, CycleOutcome::Failed { stage: CycleState::Selecting, .. }));
    assert_eq!(status.state().await, CycleState::Failed);
    assert!(harness.fetcher.downloads.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_download_failure_leaves_ledger_untouched() {
    let harness = Harness::new(
        FakeSource::with_clips(vec![clip("x", "chanA", 1)]),
        FakeFetcher {
            fail: true,
            ..FakeFetcher::default()
        },
        FakeConverter::default(),
        FakePublisher::default(),
    );

    let (outcome, _) = run(&harness).await;

    match outcome {
        CycleOutcome::Failed { stage, message } => {
            assert_eq!(stage, CycleState::Downloading);
            assert!(message.contains("yt-dlp exited"), "{}", message);
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    assert!(harness.ledger_ids().is_empty());
}

#[tokio::test]
async fn test_conversion_failure_keeps_download() {
    let harness = Harness::new(
        FakeSource::with_clips(vec![clip("x", "chanA", 1)]),
        FakeFetcher::default(),
        FakeConverter {
            fail: true,
            ..Default::default()
        },
        FakePublisher::default(),
    );

    let (outcome, _) = run(&harness).await;

    assert!(matches!(outcome, CycleOutcome::Failed { stage: CycleState::Converting, .. }));
    assert_eq!(harness.output_files().len(), 1);
    assert!(harness.publisher.uploads.lock().unwrap().is_empty());
    assert!(harness.ledger_ids().is_empty());
}

#[tokio::test]
async fn test_publish_failure_is_not_recorded() {
    let harness = Harness::new(
        FakeSource::with_clips(vec![clip("x", "chanA", 1)]),
        FakeFetcher::default(),
        FakeConverter::default(),
        FakePublisher {
            fail: true,
            ..FakePublisher::default()
        },
    );

    let (outcome, _) = run(&harness).await;

    assert!(matches!(outcome, CycleOutcome::Failed { stage: CycleState::Publishing, .. }));
    assert!(harness.ledger_ids().is_empty());
    // Source and vertical output stay for inspection
    assert_eq!(harness.output_files().len(), 2);
}
