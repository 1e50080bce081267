//! Analytical table sink
//!
//! One [`AnalysisRecord`] row is written per analyzed object. Every insert
//! carries an insert id; backends drop a row whose id they have already
//! accepted, so a retried or redelivered insert never duplicates data.

pub mod http;
pub mod jsonl;
pub mod memory;

pub use http::HttpTableSink;
pub use jsonl::{JsonlRow, JsonlSink};
pub use memory::MemorySink;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::analyzer::{AnalysisResult, WordFrequencyEntry};
use crate::config::SinkConfig;
use crate::error::Result;
use crate::storage::ObjectMetadata;

/// Row schema of the analysis table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub filename: String,
    pub bucket: String,
    pub size_bytes: u64,
    pub upload_date: DateTime<Utc>,
    pub total_words: u64,
    pub top_10_words: Vec<WordFrequencyEntry>,
}

impl AnalysisRecord {
    pub fn new(metadata: &ObjectMetadata, analysis: &AnalysisResult) -> Self {
        Self {
            filename: metadata.name.clone(),
            bucket: metadata.bucket.clone(),
            size_bytes: metadata.size_bytes,
            upload_date: metadata.updated,
            total_words: analysis.total_words,
            top_10_words: analysis.top_words.clone(),
        }
    }
}

#[async_trait]
pub trait AnalysisSink: Send + Sync {
    /// Insert one row; inserting the same `insert_id` twice is a no-op
    async fn insert_row(&self, insert_id: &str, record: &AnalysisRecord) -> Result<()>;

    fn describe(&self) -> String;
}

/// Build the sink selected in configuration
pub fn from_config(
    config: &SinkConfig,
    project: Option<&str>,
    timeout: Duration,
) -> Result<Arc<dyn AnalysisSink>> {
    Ok(match config {
        SinkConfig::Http {
            endpoint,
            dataset,
            table,
        } => Arc::new(HttpTableSink::new(
            endpoint, project, dataset, table, timeout,
        )?),
        SinkConfig::Jsonl { path } => Arc::new(JsonlSink::new(path.clone())),
    })
}
