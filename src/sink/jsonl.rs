//! JSON-lines file sink
//!
//! Each accepted row becomes one line. Before appending, the file is scanned
//! for the insert id so repeated inserts leave the file unchanged.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{AnalysisRecord, AnalysisSink};
use crate::error::{Collaborator, Result, WordflowError};

/// One line of the sink file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonlRow {
    pub insert_id: String,
    pub inserted_at: DateTime<Utc>,
    #[serde(flatten)]
    pub record: AnalysisRecord,
}

#[derive(Deserialize)]
struct InsertIdOnly {
    insert_id: String,
}

pub struct JsonlSink {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlSink {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every row currently in the file
    pub async fn rows(&self) -> Result<Vec<JsonlRow>> {
        let Some(content) = self.read_existing().await? else {
            return Ok(Vec::new());
        };
        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(WordflowError::from))
            .collect()
    }

    async fn read_existing(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.io_error("read", e)),
        }
    }

    fn io_error(&self, operation: &str, err: std::io::Error) -> WordflowError {
        WordflowError::rejected(
            Collaborator::TableSink,
            format!("failed to {operation} {}", self.path.display()),
        )
        .with_source(err)
    }
}

fn contains_insert_id(content: &str, insert_id: &str) -> bool {
    content.lines().any(|line| {
        match serde_json::from_str::<InsertIdOnly>(line) {
            Ok(row) => row.insert_id == insert_id,
            Err(_) => {
                if !line.trim().is_empty() {
                    warn!("Skipping unreadable line in sink file");
                }
                false
            }
        }
    })
}

#[async_trait]
impl AnalysisSink for JsonlSink {
    async fn insert_row(&self, insert_id: &str, record: &AnalysisRecord) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        if let Some(existing) = self.read_existing().await? {
            if contains_insert_id(&existing, insert_id) {
                debug!("Row {} already present in {}", insert_id, self.path.display());
                return Ok(());
            }
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error("create directory for", e))?;
        }

        let row = JsonlRow {
            insert_id: insert_id.to_string(),
            inserted_at: Utc::now(),
            record: record.clone(),
        };
        let mut line = serde_json::to_string(&row)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| self.io_error("open", e))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| self.io_error("append to", e))?;
        file.flush().await.map_err(|e| self.io_error("flush", e))?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("jsonl sink at {}", self.path.display())
    }
}
