//! End-to-end workflow runs over in-memory collaborators

mod common;

use common::{uploaded_at, Harness, BUCKET};
use std::sync::Arc;
use wordflow::error::{Collaborator, ErrorCode, WordflowError};
use wordflow::retry::RetryOverride;
use wordflow::workflow::{RunStatus, StepDefinition, StepKind, StorageEvent, WorkflowDefinition};
use wordflow::WordFrequencyEntry;

fn event(id: &str, name: &str) -> StorageEvent {
    StorageEvent::new(BUCKET, name).with_id(id)
}

#[tokio::test]
async fn test_full_run_inserts_one_row() {
    let harness = Harness::new();
    harness.put("notes.txt", "apple banana apple cherry banana apple");

    let report = harness
        .executor()
        .run(&event("evt-1", "notes.txt"))
        .await
        .unwrap();

    assert_eq!(report.status, RunStatus::Completed);
    assert!(!report.replayed);

    let rows = harness.sink.rows();
    assert_eq!(rows.len(), 1);
    let (insert_id, record) = &rows[0];
    assert_eq!(insert_id, "evt-1");
    assert_eq!(record.filename, "notes.txt");
    assert_eq!(record.bucket, BUCKET);
    assert_eq!(record.size_bytes, 38);
    assert_eq!(record.upload_date, uploaded_at());
    assert_eq!(record.total_words, 6);
    assert_eq!(
        record.top_10_words,
        vec![
            WordFrequencyEntry::new("apple", 3),
            WordFrequencyEntry::new("banana", 2),
            WordFrequencyEntry::new("cherry", 1),
        ]
    );
    assert_eq!(report.record.as_ref(), Some(record));
}

#[tokio::test]
async fn test_redelivery_replays_without_calling_collaborators() {
    let harness = Harness::new();
    harness.put("a.txt", "one two two");
    let event = event("evt-dup", "a.txt");

    let first = harness.executor().run(&event).await.unwrap();
    let metadata_calls = harness.store.metadata_calls();
    let fetch_calls = harness.store.fetch_calls();

    // A new executor stands in for a restarted process
    let second = harness.executor().run(&event).await.unwrap();

    assert!(second.replayed);
    assert_eq!(second.status, RunStatus::Completed);
    assert_eq!(second.record, first.record);
    assert_eq!(second.analysis, first.analysis);
    assert_eq!(harness.sink.rows().len(), 1);
    assert_eq!(harness.sink.calls(), 1);
    assert_eq!(harness.store.metadata_calls(), metadata_calls);
    assert_eq!(harness.store.fetch_calls(), fetch_calls);
}

#[tokio::test]
async fn test_transient_failure_is_retried() {
    let harness = Harness::new();
    harness.put("a.txt", "hello world");
    harness
        .store
        .fail_next(WordflowError::unavailable(Collaborator::ObjectStorage, "HTTP 503"));
    harness
        .sink
        .fail_next(WordflowError::unavailable(Collaborator::TableSink, "HTTP 429"));

    let report = harness
        .executor()
        .run(&event("evt-retry", "a.txt"))
        .await
        .unwrap();
    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(harness.sink.rows().len(), 1);
    assert_eq!(harness.sink.calls(), 2);

    let entry = harness.journal().load("evt-retry").await.unwrap().unwrap();
    assert_eq!(entry.step("metadata").unwrap().attempts, 2);
    assert_eq!(entry.step("store").unwrap().attempts, 2);
}

#[tokio::test]
async fn test_permanent_sink_failure_then_resume() {
    let harness = Harness::new();
    harness.put("a.txt", "resume me resume");
    harness
        .sink
        .fail_next(WordflowError::rejected(Collaborator::TableSink, "HTTP 400: bad row"));
    let event = event("evt-fail", "a.txt");

    let err = harness.executor().run(&event).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::WORKFLOW_STEP_FAILED);
    assert_eq!(err.root().code(), ErrorCode::SINK_REJECTED);
    assert_eq!(harness.sink.calls(), 1, "permanent errors are not retried");

    let entry = harness.journal().load("evt-fail").await.unwrap().unwrap();
    assert_eq!(entry.status, RunStatus::Failed);
    assert!(entry.last_error.as_deref().unwrap().contains("store"));
    assert!(entry.is_step_completed("analysis"));
    assert!(!entry.is_step_completed("store"));

    let metadata_calls = harness.store.metadata_calls();
    let fetch_calls = harness.store.fetch_calls();

    let report = harness.executor().run(&event).await.unwrap();
    assert_eq!(report.status, RunStatus::Completed);
    assert!(!report.replayed);
    assert_eq!(harness.sink.rows().len(), 1);
    assert_eq!(harness.store.metadata_calls(), metadata_calls);
    assert_eq!(
        harness.store.fetch_calls(),
        fetch_calls,
        "analysis was journaled, so content is not fetched again"
    );
    assert_eq!(report.record.unwrap().total_words, 3);
}

#[tokio::test]
async fn test_resume_refetches_content_when_analysis_pending() {
    let harness = Harness::new();
    harness.put("a.txt", "bytes stay out of the journal");
    let event = event("evt-content", "a.txt");
    harness.executor().run(&event).await.unwrap();

    // Rewind the journal to just after fetch_content, as if the process died there
    let journal = harness.journal();
    let mut entry = journal.load("evt-content").await.unwrap().unwrap();
    entry.steps.retain(|s| s.id == "metadata" || s.id == "content");
    entry.status = RunStatus::Running;
    journal.save(&entry).await.unwrap();

    let metadata_calls = harness.store.metadata_calls();
    let fetch_calls = harness.store.fetch_calls();
    let report = harness.executor().run(&event).await.unwrap();

    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.record.unwrap().total_words, 6);
    assert_eq!(harness.store.metadata_calls(), metadata_calls);
    assert_eq!(harness.store.fetch_calls(), fetch_calls + 1);
    assert_eq!(harness.sink.rows().len(), 1);
}

#[tokio::test]
async fn test_missing_object_fails_with_not_found() {
    let harness = Harness::new();
    let err = harness
        .executor()
        .run(&event("evt-missing", "nope.txt"))
        .await
        .unwrap_err();
    assert!(matches!(err.root(), WordflowError::NotFound { .. }));
    assert_eq!(harness.store.metadata_calls(), 1, "not found is permanent");
    assert!(harness.sink.rows().is_empty());
}

#[tokio::test]
async fn test_changed_workflow_restarts_run() {
    let mut harness = Harness::new();
    harness.put("a.txt", "alpha beta");
    let event = event("evt-v2", "a.txt");
    harness.executor().run(&event).await.unwrap();
    let fetch_calls = harness.store.fetch_calls();

    harness.definition.steps[3] =
        StepDefinition::new("store", StepKind::InsertRow).with_retry(RetryOverride {
            attempts: Some(4),
            ..RetryOverride::default()
        });
    let report = harness.executor().run(&event).await.unwrap();

    assert!(!report.replayed);
    assert_eq!(harness.store.fetch_calls(), fetch_calls + 1);
    // The insert id is unchanged, so the sink still holds a single row
    assert_eq!(harness.sink.rows().len(), 1);
    assert_eq!(harness.sink.calls(), 2);
}

#[tokio::test]
async fn test_workflow_without_insert_has_no_record() {
    let mut harness = Harness::new();
    harness.put("a.txt", "just counting");
    harness.definition =
        WorkflowDefinition::from_yaml_str("name: dry-run\nsteps:\n  - fetch_content\n  - analyze\n")
            .unwrap();

    let report = harness
        .executor()
        .run(&event("evt-dry", "a.txt"))
        .await
        .unwrap();
    assert!(report.record.is_none());
    assert_eq!(report.analysis.unwrap().total_words, 2);
    assert_eq!(harness.store.metadata_calls(), 0);
    assert!(harness.sink.rows().is_empty());
}

#[tokio::test]
async fn test_concurrent_duplicate_deliveries_insert_once() {
    let harness = Harness::new();
    harness.put("a.txt", "same event twice");
    let executor = Arc::new(harness.executor());
    let event = event("evt-race", "a.txt");

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let executor = executor.clone();
            let event = event.clone();
            tokio::spawn(async move { executor.run(&event).await })
        })
        .collect();

    let mut replayed = 0;
    for handle in handles {
        let report = handle.await.unwrap().unwrap();
        assert_eq!(report.status, RunStatus::Completed);
        if report.replayed {
            replayed += 1;
        }
    }

    assert_eq!(replayed, 3);
    assert_eq!(harness.sink.calls(), 1);
    assert_eq!(harness.store.fetch_calls(), 1);
}

#[tokio::test]
async fn test_invalid_event_is_rejected_before_running() {
    let harness = Harness::new();
    let err = harness
        .executor()
        .run(&StorageEvent::new("", "a.txt"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::INPUT_INVALID_EVENT);
    assert!(harness.journal().list().await.unwrap().is_empty());
}
