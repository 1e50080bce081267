//! Workflow executor
//!
//! Runs a [`WorkflowDefinition`] for one [`StorageEvent`], journaling each
//! completed step so a redelivered event resumes where the last delivery
//! stopped and never inserts a second row.

use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, error, info, warn};

use super::definition::{StepDefinition, StepKind, WorkflowDefinition};
use super::event::StorageEvent;
use super::journal::{Journal, JournalEntry, RunStatus};
use crate::analyzer::{AnalysisResult, TextAnalyzer};
use crate::error::{ErrorCode, Result, WordflowError};
use crate::retry::{retry, RetryPolicy};
use crate::sink::{AnalysisRecord, AnalysisSink};
use crate::storage::{ObjectMetadata, ObjectStore};

/// Outcome of running (or replaying) a workflow for one event
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub event_id: String,
    pub status: RunStatus,
    /// The event had already completed; nothing was executed
    pub replayed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<AnalysisRecord>,
    #[serde(skip)]
    pub analysis: Option<AnalysisResult>,
}

impl RunReport {
    fn from_entry(entry: &JournalEntry, replayed: bool) -> Result<Self> {
        let restored = RunState::restore(entry)?;
        Ok(Self {
            event_id: entry.event.id.clone(),
            status: entry.status,
            replayed,
            record: restored.record,
            analysis: restored.analysis,
        })
    }
}

/// Values produced by earlier steps of the current run
#[derive(Default)]
struct RunState {
    metadata: Option<ObjectMetadata>,
    content: Option<Vec<u8>>,
    analysis: Option<AnalysisResult>,
    record: Option<AnalysisRecord>,
}

impl RunState {
    /// Rebuild from journaled outputs; content is never journaled
    fn restore(entry: &JournalEntry) -> Result<Self> {
        let mut state = RunState::default();
        if let Some(output) = entry.output_of(StepKind::FetchMetadata) {
            state.metadata = Some(serde_json::from_value(output.clone())?);
        }
        if let Some(output) = entry.output_of(StepKind::Analyze) {
            state.analysis = Some(serde_json::from_value(output.clone())?);
        }
        if let Some(output) = entry.output_of(StepKind::InsertRow) {
            state.record = Some(serde_json::from_value(output.clone())?);
        }
        Ok(state)
    }
}

/// Per-event lock shared by every delivery of that event currently in `run`
struct InFlightSlot {
    lock: Arc<Mutex<()>>,
    holders: usize,
}

type InFlightMap = std::sync::Mutex<HashMap<String, InFlightSlot>>;

/// Registration in the in-flight map, released on drop even if `run` is cancelled
struct InFlight<'a> {
    map: &'a InFlightMap,
    event_id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl<'a> InFlight<'a> {
    fn register(map: &'a InFlightMap, event_id: &str) -> (Self, Arc<Mutex<()>>) {
        let mut slots = map.lock().unwrap_or_else(PoisonError::into_inner);
        let slot = slots
            .entry(event_id.to_string())
            .or_insert_with(|| InFlightSlot {
                lock: Arc::new(Mutex::new(())),
                holders: 0,
            });
        slot.holders += 1;
        let lock = slot.lock.clone();
        let registration = Self {
            map,
            event_id: event_id.to_string(),
            guard: None,
        };
        (registration, lock)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut slots = self.map.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(slot) = slots.get_mut(&self.event_id) {
            slot.holders -= 1;
            if slot.holders == 0 {
                slots.remove(&self.event_id);
            }
        }
    }
}

pub struct WorkflowExecutor {
    definition: WorkflowDefinition,
    workflow_hash: String,
    store: Arc<dyn ObjectStore>,
    sink: Arc<dyn AnalysisSink>,
    analyzer: TextAnalyzer,
    retry: RetryPolicy,
    journal: Journal,
    in_flight: InFlightMap,
}

impl WorkflowExecutor {
    pub fn new(
        definition: WorkflowDefinition,
        store: Arc<dyn ObjectStore>,
        sink: Arc<dyn AnalysisSink>,
        analyzer: TextAnalyzer,
        retry: RetryPolicy,
        journal: Journal,
    ) -> Result<Self> {
        definition.validate()?;
        retry.validate()?;
        let workflow_hash = definition.hash();
        Ok(Self {
            definition,
            workflow_hash,
            store,
            sink,
            analyzer,
            retry,
            journal,
            in_flight: std::sync::Mutex::new(HashMap::new()),
        })
    }

    pub fn definition(&self) -> &WorkflowDefinition {
        &self.definition
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    pub fn analyzer(&self) -> &TextAnalyzer {
        &self.analyzer
    }

    /// Run the workflow for `event`, resuming or replaying a journaled run
    pub async fn run(&self, event: &StorageEvent) -> Result<RunReport> {
        event.validate()?;

        let _in_flight = self.acquire(&event.id).await;
        self.run_exclusive(event).await
    }

    /// Journaled state of an event, if it has been seen
    pub async fn status(&self, event_id: &str) -> Result<Option<JournalEntry>> {
        self.journal.load(event_id).await
    }

    // A duplicate concurrent delivery waits here for the first to finish
    async fn acquire(&self, event_id: &str) -> InFlight<'_> {
        let (mut registration, lock) = InFlight::register(&self.in_flight, event_id);
        registration.guard = Some(lock.lock_owned().await);
        registration
    }

    async fn run_exclusive(&self, event: &StorageEvent) -> Result<RunReport> {
        let mut entry = match self.journal.load(&event.id).await? {
            Some(entry) if entry.workflow_hash != self.workflow_hash => {
                warn!(
                    "Journal for event {} was written by a different version of workflow '{}', restarting",
                    event.id, entry.workflow_name
                );
                JournalEntry::new(event, &self.definition)
            }
            Some(entry) if entry.status == RunStatus::Completed => {
                info!(
                    "Event {} already processed, replaying recorded outcome",
                    event.id
                );
                return RunReport::from_entry(&entry, true);
            }
            Some(entry) => {
                info!(
                    "Resuming event {} after {} completed step(s)",
                    event.id,
                    entry.steps.len()
                );
                entry
            }
            None => JournalEntry::new(event, &self.definition),
        };

        entry.start_run();
        self.journal.save(&entry).await?;
        info!(
            "Running workflow '{}' for {} (event {})",
            self.definition.name,
            event.object_ref(),
            event.id
        );

        let mut state = RunState::restore(&entry)?;
        let needs_content = self
            .definition
            .steps
            .iter()
            .any(|s| s.call == StepKind::Analyze && !entry.is_step_completed(&s.id));

        for step in &self.definition.steps {
            let rerun_for_content = step.call == StepKind::FetchContent && needs_content;
            if entry.is_step_completed(&step.id) && !rerun_for_content {
                debug!("Step '{}' already completed, skipping", step.id);
                continue;
            }

            let (result, attempts) = self.execute_step(step, event, &mut state).await;
            match result {
                Ok(output) => {
                    debug!("Step '{}' completed after {} attempt(s)", step.id, attempts);
                    entry.record_step(step, output, attempts);
                    self.journal.save(&entry).await?;
                }
                Err(err) => {
                    let err = WordflowError::step_failed(&step.id, attempts, err);
                    error!("Workflow '{}' failed: {}", self.definition.name, err);
                    entry.mark_failed(&err);
                    self.journal.save(&entry).await?;
                    return Err(err);
                }
            }
        }

        entry.mark_completed();
        self.journal.save(&entry).await?;
        info!("Event {} completed", event.id);

        Ok(RunReport {
            event_id: event.id.clone(),
            status: entry.status,
            replayed: false,
            record: state.record,
            analysis: state.analysis,
        })
    }

    async fn execute_step(
        &self,
        step: &StepDefinition,
        event: &StorageEvent,
        state: &mut RunState,
    ) -> (Result<Value>, u32) {
        let policy = step.policy(&self.retry);
        let context = format!("step '{}' ({})", step.id, step.call);

        match step.call {
            StepKind::FetchMetadata => {
                let outcome = retry(&policy, &context, || {
                    self.store.metadata(&event.bucket, &event.name)
                })
                .await;
                let result = outcome.result.and_then(|metadata| {
                    let output = serde_json::to_value(&metadata)?;
                    state.metadata = Some(metadata);
                    Ok(output)
                });
                (result, outcome.attempts)
            }
            StepKind::FetchContent => {
                let outcome =
                    retry(&policy, &context, || self.store.fetch(&event.bucket, &event.name))
                        .await;
                let result = outcome.result.map(|content| {
                    let output = json!({ "bytes": content.len() });
                    state.content = Some(content);
                    output
                });
                (result, outcome.attempts)
            }
            StepKind::Analyze => {
                let result = missing_input(&state.content, step, StepKind::FetchContent)
                    .and_then(|content| self.analyzer.analyze(content))
                    .and_then(|analysis| {
                        let output = serde_json::to_value(&analysis)?;
                        state.analysis = Some(analysis);
                        Ok(output)
                    });
                (result, 1)
            }
            StepKind::InsertRow => {
                let record = match (
                    missing_input(&state.metadata, step, StepKind::FetchMetadata),
                    missing_input(&state.analysis, step, StepKind::Analyze),
                ) {
                    (Ok(metadata), Ok(analysis)) => AnalysisRecord::new(metadata, analysis),
                    (Err(e), _) | (_, Err(e)) => return (Err(e), 0),
                };

                let outcome = retry(&policy, &context, || {
                    self.sink.insert_row(&event.id, &record)
                })
                .await;
                let result = outcome.result.and_then(|()| {
                    let output = serde_json::to_value(&record)?;
                    state.record = Some(record);
                    Ok(output)
                });
                (result, outcome.attempts)
            }
        }
    }
}

fn missing_input<'a, T>(
    value: &'a Option<T>,
    step: &StepDefinition,
    producer: StepKind,
) -> Result<&'a T> {
    value.as_ref().ok_or_else(|| {
        WordflowError::workflow_with_code(
            ErrorCode::WORKFLOW_MISSING_INPUT,
            format!(
                "step '{}' ({}) has no {} output to work from",
                step.id, step.call, producer
            ),
        )
    })
}
