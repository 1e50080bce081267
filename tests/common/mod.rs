//! Shared fixtures for integration tests

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;
use tempfile::TempDir;

use wordflow::analyzer::{AnalyzerConfig, TextAnalyzer};
use wordflow::retry::RetryPolicy;
use wordflow::sink::MemorySink;
use wordflow::storage::MemoryObjectStore;
use wordflow::workflow::{Journal, WorkflowDefinition, WorkflowExecutor};

pub const BUCKET: &str = "uploads";

pub fn uploaded_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 10, 30, 0).unwrap()
}

/// Retries without waiting, so transient-failure tests stay fast
pub fn fast_retry(attempts: u32) -> RetryPolicy {
    RetryPolicy {
        attempts,
        initial_delay: std::time::Duration::from_millis(1),
        max_delay: std::time::Duration::from_millis(5),
        ..RetryPolicy::default()
    }
}

/// Executor over in-memory collaborators with a journal in a temp dir
pub struct Harness {
    pub store: Arc<MemoryObjectStore>,
    pub sink: Arc<MemorySink>,
    pub state_dir: TempDir,
    pub definition: WorkflowDefinition,
    pub retry: RetryPolicy,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            store: Arc::new(MemoryObjectStore::new()),
            sink: Arc::new(MemorySink::new()),
            state_dir: TempDir::new().unwrap(),
            definition: WorkflowDefinition::default(),
            retry: fast_retry(3),
        }
    }

    pub fn put(&self, name: &str, content: &str) {
        self.store.put(BUCKET, name, content, uploaded_at());
    }

    pub fn journal(&self) -> Journal {
        Journal::new(self.state_dir.path())
    }

    /// A fresh executor sharing the same collaborators and journal
    pub fn executor(&self) -> WorkflowExecutor {
        WorkflowExecutor::new(
            self.definition.clone(),
            self.store.clone(),
            self.sink.clone(),
            TextAnalyzer::new(AnalyzerConfig::default()),
            self.retry.clone(),
            self.journal(),
        )
        .unwrap()
    }
}
