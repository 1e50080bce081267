//! HTTP object store and table sink against a local fake server

mod common;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

use common::{fast_retry, uploaded_at};
use wordflow::analyzer::TextAnalyzer;
use wordflow::error::{ErrorCode, WordflowError};
use wordflow::sink::{AnalysisRecord, AnalysisSink, HttpTableSink};
use wordflow::storage::{HttpObjectStore, ObjectStore};
use wordflow::workflow::{Journal, RunStatus, StorageEvent, WorkflowDefinition, WorkflowExecutor};

#[derive(Default)]
struct FakeCloud {
    objects: HashMap<(String, String), String>,
    inserted: Mutex<Vec<Value>>,
    /// Respond 503 to this many requests before behaving
    unavailable: AtomicUsize,
    reject_rows: bool,
}

impl FakeCloud {
    fn with_object(mut self, bucket: &str, name: &str, content: &str) -> Self {
        self.objects
            .insert((bucket.to_string(), name.to_string()), content.to_string());
        self
    }

    fn take_unavailable(&self) -> bool {
        self.unavailable
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

async fn get_object(
    State(cloud): State<Arc<FakeCloud>>,
    Path((bucket, name)): Path<(String, String)>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if cloud.take_unavailable() {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    let Some(content) = cloud.objects.get(&(bucket.clone(), name.clone())) else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"error": {"code": 404, "message": "No such object"}})),
        )
            .into_response();
    };

    if query.get("alt").map(String::as_str) == Some("media") {
        return content.clone().into_response();
    }
    Json(json!({
        "kind": "storage#object",
        "bucket": bucket,
        "name": name,
        "size": content.len().to_string(),
        "updated": "2024-05-01T10:30:00.000Z",
        "contentType": "text/plain"
    }))
    .into_response()
}

async fn insert_all(
    State(cloud): State<Arc<FakeCloud>>,
    Path((project, dataset, table)): Path<(String, String, String)>,
    Json(body): Json<Value>,
) -> Response {
    if cloud.take_unavailable() {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    assert_eq!(
        (project.as_str(), dataset.as_str(), table.as_str()),
        ("acme", "analytics", "file_stats")
    );
    if cloud.reject_rows {
        return Json(json!({
            "kind": "bigquery#tableDataInsertAllResponse",
            "insertErrors": [{"index": 0, "errors": [{"reason": "invalid", "message": "no such field"}]}]
        }))
        .into_response();
    }
    cloud.inserted.lock().unwrap().push(body);
    Json(json!({"kind": "bigquery#tableDataInsertAllResponse"})).into_response()
}

/// Serve the fake on an ephemeral port and return its base URL
async fn spawn(cloud: Arc<FakeCloud>) -> String {
    let app = Router::new()
        .route("/storage/v1/b/{bucket}/o/{name}", get(get_object))
        .route(
            "/bigquery/v2/projects/{project}/datasets/{dataset}/tables/{table}/insertAll",
            post(insert_all),
        )
        .with_state(cloud);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn store(base: &str) -> HttpObjectStore {
    HttpObjectStore::new(&format!("{base}/storage/v1"), Duration::from_secs(5)).unwrap()
}

fn sink(base: &str) -> HttpTableSink {
    HttpTableSink::new(
        &format!("{base}/bigquery/v2"),
        Some("acme"),
        "analytics",
        "file_stats",
        Duration::from_secs(5),
    )
    .unwrap()
}

#[tokio::test]
async fn test_metadata_and_content() {
    let cloud = Arc::new(FakeCloud::default().with_object("uploads", "notes/a b.txt", "Hello hello"));
    let base = spawn(cloud).await;
    let store = store(&base);

    let meta = store.metadata("uploads", "notes/a b.txt").await.unwrap();
    assert_eq!(meta.bucket, "uploads");
    assert_eq!(meta.name, "notes/a b.txt");
    assert_eq!(meta.size_bytes, 11);
    assert_eq!(meta.updated, uploaded_at());
    assert_eq!(meta.content_type.as_deref(), Some("text/plain"));

    let content = store.fetch("uploads", "notes/a b.txt").await.unwrap();
    assert_eq!(content, b"Hello hello");
}

#[tokio::test]
async fn test_missing_object_is_not_found() {
    let base = spawn(Arc::new(FakeCloud::default())).await;
    let err = store(&base).metadata("uploads", "absent.txt").await.unwrap_err();
    assert!(matches!(err, WordflowError::NotFound { .. }));
    assert_eq!(err.code(), ErrorCode::STORAGE_NOT_FOUND);
}

#[tokio::test]
async fn test_server_error_is_transient() {
    let cloud = FakeCloud::default().with_object("b", "n", "x");
    cloud.unavailable.store(1, Ordering::SeqCst);
    let base = spawn(Arc::new(cloud)).await;

    let err = store(&base).fetch("b", "n").await.unwrap_err();
    assert!(err.is_transient());
    assert_eq!(err.code(), ErrorCode::STORAGE_UNAVAILABLE);
}

#[tokio::test]
async fn test_connection_refused_is_transient() {
    // Bind then drop to get a port nobody listens on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = store(&format!("http://{addr}"))
        .metadata("b", "n")
        .await
        .unwrap_err();
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_insert_row_sends_insert_id() {
    let cloud = Arc::new(FakeCloud::default());
    let base = spawn(cloud.clone()).await;
    let analysis = TextAnalyzer::default().analyze(b"to be or not to be").unwrap();
    let meta = wordflow::storage::ObjectMetadata {
        bucket: "uploads".into(),
        name: "hamlet.txt".into(),
        size_bytes: 18,
        updated: uploaded_at(),
        content_type: None,
    };
    let record = AnalysisRecord::new(&meta, &analysis);

    sink(&base).insert_row("evt-42", &record).await.unwrap();

    let inserted = cloud.inserted.lock().unwrap().clone();
    assert_eq!(inserted.len(), 1);
    let row = &inserted[0]["rows"][0];
    assert_eq!(row["insertId"], "evt-42");
    assert_eq!(row["json"]["filename"], "hamlet.txt");
    assert_eq!(row["json"]["upload_date"], "2024-05-01T10:30:00Z");
    assert_eq!(row["json"]["total_words"], 6);
    assert_eq!(row["json"]["top_10_words"][0], json!({"word": "to", "count": 2}));
}

#[tokio::test]
async fn test_insert_errors_are_permanent() {
    let cloud = Arc::new(FakeCloud {
        reject_rows: true,
        ..FakeCloud::default()
    });
    let base = spawn(cloud).await;
    let meta = wordflow::storage::ObjectMetadata {
        bucket: "b".into(),
        name: "n".into(),
        size_bytes: 0,
        updated: uploaded_at(),
        content_type: None,
    };
    let record = AnalysisRecord::new(&meta, &Default::default());

    let err = sink(&base).insert_row("evt", &record).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::SINK_INSERT_ERRORS);
    assert!(!err.is_transient());
    assert!(err.to_string().contains("no such field"));
}

#[tokio::test]
async fn test_workflow_over_http_retries_unavailable_collaborators() {
    let cloud = FakeCloud::default().with_object("uploads", "report.txt", "The cat and the hat");
    cloud.unavailable.store(2, Ordering::SeqCst);
    let cloud = Arc::new(cloud);
    let base = spawn(cloud.clone()).await;
    let state_dir = TempDir::new().unwrap();

    let executor = WorkflowExecutor::new(
        WorkflowDefinition::default(),
        Arc::new(store(&base)),
        Arc::new(sink(&base)),
        TextAnalyzer::default(),
        fast_retry(3),
        Journal::new(state_dir.path()),
    )
    .unwrap();

    let event = StorageEvent::new("uploads", "report.txt").with_id("evt-http");
    let report = executor.run(&event).await.unwrap();
    assert_eq!(report.status, RunStatus::Completed);

    let record = report.record.unwrap();
    assert_eq!(record.total_words, 5);
    assert_eq!(record.top_10_words[0].word, "the");
    assert_eq!(record.top_10_words[0].count, 2);
    assert_eq!(cloud.inserted.lock().unwrap().len(), 1);

    let entry = executor.status("evt-http").await.unwrap().unwrap();
    assert_eq!(entry.step("metadata").unwrap().attempts, 3);
}
