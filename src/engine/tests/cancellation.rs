use std::sync::Arc;
use std::time::Duration;

use super::registry;
use crate::engine::test_helpers::*;
use crate::engine::Transition;
use crate::error::Error;
use crate::types::{Event, ProcessStatus};

#[tokio::test]
async fn test_cancel_before_first_page() {
    let source = Arc::new(VecSource::with_ids(1..=4));
    let mut h = Harness::new(registry(&[("A", source.clone())]), 2);

    let info = h.orchestrator.start_all().await.unwrap();
    h.orchestrator.cancel(info.id).await.unwrap();

    let outcomes = h.drain().await;
    assert!(matches!(outcomes.as_slice(), [Ok(Transition::Cancelled)]));
    assert_eq!(source.fetches(), 0);
    assert!(h.uploader.calls().is_empty());
    assert_eq!(h.tracker.get_entry(info.id).await.status, ProcessStatus::Cancelled);
    assert!(
        h.take_events()
            .iter()
            .any(|e| matches!(e, Event::RunCancelled { id } if *id == info.id))
    );
}

#[tokio::test]
async fn test_cancel_between_pages() {
    let source = Arc::new(VecSource::with_ids(1..=6));
    let h = Harness::new(registry(&[("A", source.clone())]), 2);

    let info = h.orchestrator.start_all().await.unwrap();
    assert!(matches!(
        h.drain_one().await,
        Some(Ok(Transition::Continued { page: 1, .. }))
    ));

    h.orchestrator.cancel(info.id).await.unwrap();
    assert!(matches!(
        h.drain_one().await,
        Some(Ok(Transition::Cancelled))
    ));

    assert_eq!(source.fetches(), 1);
    assert_eq!(h.uploader.calls().len(), 1);
    assert_eq!(h.tracker.count(|c| matches!(c, TrackerCall::Cancel)), 1);
    assert_eq!(h.tracker.count(|c| matches!(c, TrackerCall::Finish)), 0);
    assert!(h.queue.pop().is_none());

    // Once terminal, a second cancel is a state conflict
    assert!(matches!(
        h.orchestrator.cancel(info.id).await,
        Err(Error::InvalidState { .. })
    ));
}

#[tokio::test]
async fn test_run_timeout_is_fatal() {
    let mut h = Harness::new(registry(&[("A", Arc::new(VecSource::with_ids(1..=4)))]), 2);
    h.engine = h
        .engine
        .clone()
        .with_run_timeout(Some(Duration::from_secs(60)));

    let info = h.orchestrator.start_all().await.unwrap();
    let mut state = h.queue.pop().unwrap();
    state.context.started_at = chrono::Utc::now() - chrono::Duration::minutes(5);

    let result = h.engine.handle_continuation(state).await;
    match result {
        Err(Error::TimedOut { id, elapsed_secs }) => {
            assert_eq!(id, info.id);
            assert!(elapsed_secs >= 299);
        }
        other => panic!("expected timeout, got {other:?}"),
    }

    let entry = h.tracker.get_entry(info.id).await;
    assert_eq!(entry.status, ProcessStatus::Errored);
    assert!(h.uploader.calls().is_empty());
}

#[tokio::test]
async fn test_run_within_timeout_completes() {
    let mut h = Harness::new(registry(&[("A", Arc::new(VecSource::with_ids(1..=4)))]), 2);
    h.engine = h
        .engine
        .clone()
        .with_run_timeout(Some(Duration::from_secs(60)));

    h.orchestrator.start_all().await.unwrap();
    let outcomes = h.drain().await;
    assert!(matches!(outcomes.last(), Some(Ok(Transition::Finished))));
}
