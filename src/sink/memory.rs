//! In-memory sink for testing

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::{AnalysisRecord, AnalysisSink};
use crate::error::{Result, WordflowError};

/// Records rows in memory, de-duplicating by insert id
#[derive(Default)]
pub struct MemorySink {
    rows: Mutex<Vec<(String, AnalysisRecord)>>,
    failures: Mutex<VecDeque<WordflowError>>,
    calls: AtomicUsize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next insert with `error`
    pub fn fail_next(&self, error: WordflowError) {
        self.failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(error);
    }

    pub fn rows(&self) -> Vec<(String, AnalysisRecord)> {
        self.rows.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Number of insert attempts, successful or not
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnalysisSink for MemorySink {
    async fn insert_row(&self, insert_id: &str, record: &AnalysisRecord) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self
            .failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
        {
            return Err(err);
        }

        let mut rows = self.rows.lock().unwrap_or_else(|e| e.into_inner());
        if !rows.iter().any(|(id, _)| id == insert_id) {
            rows.push((insert_id.to_string(), record.clone()));
        }
        Ok(())
    }

    fn describe(&self) -> String {
        "in-memory sink".to_string()
    }
}
