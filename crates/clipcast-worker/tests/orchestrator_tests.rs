//! Orchestrator loop tests.

mod common;

use std::sync::Arc;
use std::time::Duration;

use clipcast_models::{CycleOutcome, CycleState, TriggerKind};
use tokio::sync::watch;

use common::{clip, eventually, Harness, RecordingNotifier};

#[tokio::test]
async fn test_manual_cycle_is_relayed_to_chat() {
    let harness = Harness::with_clips(vec![clip("clip-1", "chanA", 300)]);
    let notifier = Arc::new(RecordingNotifier::default());
    let (orchestrator, _, status) = harness.orchestrator(notifier.clone());

    let outcome = orchestrator.run_cycle(TriggerKind::Manual).await;

    assert!(matches!(outcome, CycleOutcome::Published { .. }));
    assert_eq!(
        *notifier.messages.lock().unwrap(),
        vec![
            "Manual cycle started by /make".to_string(),
            "Video uploaded: https://youtu.be/xyz123".to_string(),
        ]
    );
    let snapshot = status.snapshot().await;
    assert_eq!(snapshot.state, CycleState::Idle);
    assert_eq!(snapshot.last_outcome, Some(outcome));
}

#[tokio::test]
async fn test_scheduled_cycle_is_not_relayed() {
    let harness = Harness::with_clips(vec![]);
    let notifier = Arc::new(RecordingNotifier::default());
    let (orchestrator, _, _) = harness.orchestrator(notifier.clone());

    let outcome = orchestrator.run_cycle(TriggerKind::Scheduled).await;

    assert_eq!(outcome, CycleOutcome::NothingNew);
    assert!(notifier.messages.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_loop_runs_on_startup_then_on_trigger() {
    let harness = Harness::with_clips(vec![clip("first", "chanA", 100), clip("second", "chanA", 50)]);
    let notifier = Arc::new(RecordingNotifier::default());
    let (orchestrator, trigger, _) = harness.orchestrator(notifier.clone());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(async move { orchestrator.run(shutdown_rx).await });

    // Startup cycle publishes the most viewed clip
    eventually(|| harness.ledger_ids() == vec!["first"]).await;
    assert!(notifier.messages.lock().unwrap().is_empty());

    assert!(trigger.request().await);
    eventually(|| harness.ledger_ids() == vec!["first", "second"]).await;
    eventually(|| notifier.messages.lock().unwrap().len() == 2).await;
    assert!(!trigger.is_pending());

    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(2), task).await.unwrap().unwrap();
}

#[tokio::test]
async fn test_manual_request_while_busy_runs_after_current_cycle() {
    let harness = Harness::new(
        common::FakeSource::with_clips(vec![clip("a", "chanA", 300), clip("b", "chanA", 100)]),
        common::FakeFetcher::default(),
        common::FakeConverter::slow(Duration::from_millis(200)),
        common::FakePublisher::default(),
    );
    let notifier = Arc::new(RecordingNotifier::default());
    let (orchestrator, trigger, status) = harness.orchestrator(notifier.clone());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(async move { orchestrator.run(shutdown_rx).await });

    // The startup cycle is converting; /make twice while it runs
    eventually(|| harness.converter.active() == 1).await;
    assert_eq!(status.state().await, CycleState::Converting);
    assert!(trigger.request().await);
    assert!(!trigger.request().await);
    assert!(notifier.messages.lock().unwrap().is_empty());

    eventually(|| harness.ledger_ids() == vec!["a", "b"]).await;
    eventually(|| notifier.messages.lock().unwrap().len() == 2).await;

    assert_eq!(harness.converter.max_active.load(std::sync::atomic::Ordering::SeqCst), 1);
    let titles: Vec<_> = harness.publisher.uploads.lock().unwrap().iter().map(|(_, t)| t.clone()).collect();
    assert_eq!(titles, vec!["a highlight", "b highlight"]);
    // Both requests collapsed into one manual cycle
    assert_eq!(
        *notifier.messages.lock().unwrap(),
        vec![
            "Manual cycle started by /make".to_string(),
            "Video uploaded: https://youtu.be/xyz123".to_string(),
        ]
    );
    assert!(!trigger.is_pending());

    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(2), task).await.unwrap().unwrap();
}

#[tokio::test]
async fn test_failed_manual_cycle_reports_stage() {
    let harness = Harness::new(
        common::FakeSource::with_clips(vec![clip("x", "chanA", 1)]),
        common::FakeFetcher {
            fail: true,
            ..Default::default()
        },
        common::FakeConverter::default(),
        common::FakePublisher::default(),
    );
    let notifier = Arc::new(RecordingNotifier::default());
    let (orchestrator, _, _) = harness.orchestrator(notifier.clone());

    orchestrator.run_cycle(TriggerKind::Manual).await;

    let messages = notifier.messages.lock().unwrap();
    assert!(messages[1].starts_with("Manual cycle failed: failed while downloading"), "{}", messages[1]);
}

#[tokio::test]
async fn test_shutdown_while_idle() {
    let harness = Harness::with_clips(vec![]);
    let notifier = Arc::new(RecordingNotifier::default());
    let (orchestrator, _, status) = harness.orchestrator(notifier);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(async move { orchestrator.run(shutdown_rx).await });

    // The startup cycle finds nothing and the loop goes idle
    let mut idle = false;
    for _ in 0..200 {
        let snapshot = status.snapshot().await;
        if snapshot.last_outcome.is_some() && snapshot.next_run_at.is_some() {
            idle = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(idle);
    assert_eq!(status.snapshot().await.last_outcome, Some(CycleOutcome::NothingNew));

    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(2), task).await.unwrap().unwrap();
}
