//! Durable per-event step journal
//!
//! One JSON file per event id, named by the SHA-256 of the id so arbitrary
//! ids map to safe file names. Files are replaced atomically (write to a
//! temporary file, then rename) after every completed step.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use super::definition::{StepDefinition, StepKind, WorkflowDefinition};
use super::event::StorageEvent;
use crate::error::{ErrorExt, Result, WordflowError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

/// Output of one completed step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub id: String,
    pub call: StepKind,
    pub output: Value,
    pub attempts: u32,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub event: StorageEvent,
    pub workflow_name: String,
    pub workflow_hash: String,
    pub status: RunStatus,
    #[serde(default)]
    pub steps: Vec<StepRecord>,
    /// Number of times a run of this event has started
    #[serde(default)]
    pub runs: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JournalEntry {
    pub fn new(event: &StorageEvent, definition: &WorkflowDefinition) -> Self {
        let now = Utc::now();
        Self {
            event: event.clone(),
            workflow_name: definition.name.clone(),
            workflow_hash: definition.hash(),
            status: RunStatus::Running,
            steps: Vec::new(),
            runs: 0,
            last_error: None,
            started_at: now,
            updated_at: now,
        }
    }

    pub fn step(&self, id: &str) -> Option<&StepRecord> {
        self.steps.iter().find(|s| s.id == id)
    }

    pub fn is_step_completed(&self, id: &str) -> bool {
        self.step(id).is_some()
    }

    /// Latest recorded output of a step kind
    pub fn output_of(&self, kind: StepKind) -> Option<&Value> {
        self.steps
            .iter()
            .rev()
            .find(|s| s.call == kind)
            .map(|s| &s.output)
    }

    pub fn start_run(&mut self) {
        self.runs += 1;
        self.status = RunStatus::Running;
        self.last_error = None;
        self.updated_at = Utc::now();
    }

    pub fn record_step(&mut self, step: &StepDefinition, output: Value, attempts: u32) {
        let now = Utc::now();
        self.steps.retain(|s| s.id != step.id);
        self.steps.push(StepRecord {
            id: step.id.clone(),
            call: step.call,
            output,
            attempts,
            completed_at: now,
        });
        self.updated_at = now;
    }

    pub fn mark_failed(&mut self, error: &WordflowError) {
        self.status = RunStatus::Failed;
        self.last_error = Some(error.to_string());
        self.updated_at = Utc::now();
    }

    pub fn mark_completed(&mut self) {
        self.status = RunStatus::Completed;
        self.last_error = None;
        self.updated_at = Utc::now();
    }
}

/// Directory of journal entries
#[derive(Debug, Clone)]
pub struct Journal {
    dir: PathBuf,
}

impl Journal {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, event_id: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(event_id.as_bytes());
        self.dir.join(format!("{:x}.json", hasher.finalize()))
    }

    pub async fn load(&self, event_id: &str) -> Result<Option<JournalEntry>> {
        let path = self.path_for(event_id);
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(WordflowError::journal("failed to read journal entry", Some(path))
                    .with_source(e))
            }
        };

        let entry: JournalEntry = serde_json::from_str(&content)
            .to_journal_error("corrupt journal entry", Some(path.clone()))?;
        if entry.event.id != event_id {
            return Err(WordflowError::journal(
                format!(
                    "journal entry belongs to event '{}', expected '{}'",
                    entry.event.id, event_id
                ),
                Some(path),
            ));
        }
        Ok(Some(entry))
    }

    pub async fn save(&self, entry: &JournalEntry) -> Result<()> {
        let path = self.path_for(&entry.event.id);
        let temp_path = path.with_extension("json.tmp");

        fs::create_dir_all(&self.dir)
            .await
            .to_journal_error("failed to create journal directory", Some(self.dir.clone()))?;

        let json = serde_json::to_string_pretty(entry)?;
        fs::write(&temp_path, json)
            .await
            .to_journal_error("failed to write journal entry", Some(temp_path.clone()))?;
        fs::rename(&temp_path, &path)
            .await
            .to_journal_error("failed to replace journal entry", Some(path.clone()))?;

        debug!(
            "Journaled event {} ({:?}, {} step(s))",
            entry.event.id,
            entry.status,
            entry.steps.len()
        );
        Ok(())
    }

    /// Forget an event; returns whether an entry existed
    pub async fn remove(&self, event_id: &str) -> Result<bool> {
        let path = self.path_for(event_id);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(
                WordflowError::journal("failed to remove journal entry", Some(path)).with_source(e),
            ),
        }
    }

    /// All entries, most recently updated first
    pub async fn list(&self) -> Result<Vec<JournalEntry>> {
        let mut entries = Vec::new();
        let mut dir = match fs::read_dir(&self.dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(entries),
            Err(e) => {
                return Err(WordflowError::journal(
                    "failed to list journal directory",
                    Some(self.dir.clone()),
                )
                .with_source(e))
            }
        };

        while let Some(item) = dir
            .next_entry()
            .await
            .to_journal_error("failed to list journal directory", Some(self.dir.clone()))?
        {
            let path = item.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let content = fs::read_to_string(&path)
                .await
                .to_journal_error("failed to read journal entry", Some(path.clone()))?;
            let entry: JournalEntry = serde_json::from_str(&content)
                .to_journal_error("corrupt journal entry", Some(path.clone()))?;
            entries.push(entry);
        }

        entries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(entries)
    }
}
