//! Route handlers

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

use super::error::ApiError;
use super::AppState;
use crate::analyzer::{AnalysisResult, TextAnalyzer};
use crate::error::{ErrorCode, Result};
use crate::workflow::{JournalEntry, RunReport, StorageEvent};

pub(super) async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub(super) async fn analyze(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> std::result::Result<Json<AnalysisResult>, ApiError> {
    let result = analyze_blocking(&state, body, |analyzer, content| analyzer.analyze(content)).await?;
    Ok(Json(result))
}

pub(super) async fn word_count(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> std::result::Result<Json<Value>, ApiError> {
    let total =
        analyze_blocking(&state, body, |analyzer, content| analyzer.count_words(content)).await?;
    Ok(Json(json!({ "total_words": total })))
}

pub(super) async fn word_frequency(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> std::result::Result<Json<Value>, ApiError> {
    let top = analyze_blocking(&state, body, |analyzer, content| {
        analyzer.word_frequencies(content)
    })
    .await?;
    Ok(Json(json!({ "top_10_words": top })))
}

pub(super) async fn submit_event(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> std::result::Result<Json<RunReport>, ApiError> {
    let event: StorageEvent = serde_json::from_slice(&body).map_err(|e| {
        ApiError::new(
            StatusCode::BAD_REQUEST,
            ErrorCode::INPUT_INVALID_EVENT,
            format!("invalid storage event: {e}"),
        )
    })?;
    debug!("Received event {} for {}", event.id, event.object_ref());

    let report = state.executor.run(&event).await?;
    Ok(Json(report))
}

pub(super) async fn event_status(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<String>,
) -> std::result::Result<Json<JournalEntry>, ApiError> {
    match state.executor.status(&event_id).await? {
        Some(entry) => Ok(Json(entry)),
        None => Err(ApiError::new(
            StatusCode::NOT_FOUND,
            ErrorCode::INPUT_INVALID_EVENT,
            format!("no run recorded for event '{event_id}'"),
        )),
    }
}

/// Run CPU-bound analysis off the async workers
async fn analyze_blocking<T, F>(
    state: &AppState,
    body: Bytes,
    operation: F,
) -> std::result::Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&TextAnalyzer, &[u8]) -> Result<T> + Send + 'static,
{
    let analyzer = state.analyzer.clone();
    let result = tokio::task::spawn_blocking(move || operation(&analyzer, &body))
        .await
        .map_err(|e| ApiError::internal(format!("analysis task failed: {e}")))?;
    Ok(result?)
}
