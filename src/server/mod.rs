//! HTTP service
//!
//! | Route | Body | Response |
//! |---|---|---|
//! | `GET /health` | | `{"status":"ok"}` |
//! | `POST /analyze` | raw text | `{"total_words", "top_10_words"}` |
//! | `POST /word-count` | raw text | `{"total_words"}` |
//! | `POST /word-frequency` | raw text | `{"top_10_words"}` |
//! | `POST /events` | storage event JSON | `{"event_id", "status", "replayed", "record"}` |
//! | `GET /events/{id}` | | journal entry |
//!
//! Errors are returned as `{"error": "...", "code": n}`.

pub mod error;
mod handlers;

pub use error::{ApiError, ErrorBody};

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::analyzer::TextAnalyzer;
use crate::error::{Result, WordflowError};
use crate::workflow::WorkflowExecutor;

/// Shared handler state
pub struct AppState {
    pub analyzer: TextAnalyzer,
    pub executor: Arc<WorkflowExecutor>,
}

impl AppState {
    pub fn new(executor: Arc<WorkflowExecutor>) -> Self {
        Self {
            analyzer: executor.analyzer().clone(),
            executor,
        }
    }
}

/// Build the router with body limit, tracing and CORS layers
pub fn router(state: Arc<AppState>, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/analyze", post(handlers::analyze))
        .route("/word-count", post(handlers::word_count))
        .route("/word-frequency", post(handlers::word_frequency))
        .route("/events", post(handlers::submit_event))
        .route("/events/{id}", get(handlers::event_status))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn bind(addr: SocketAddr) -> Result<TcpListener> {
    TcpListener::bind(addr).await.map_err(|e| {
        WordflowError::config(format!("failed to bind {addr}")).with_source(e)
    })
}

/// Serve until Ctrl-C
pub async fn serve(listener: TcpListener, app: Router) -> Result<()> {
    info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown requested");
    }
}
