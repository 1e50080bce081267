//! Event-driven analysis workflows
//!
//! A storage event (an object was uploaded) triggers a [`WorkflowDefinition`]:
//! fetch the object's metadata and content, analyze the text, insert one row
//! into the analysis table. The [`WorkflowExecutor`] journals every completed
//! step per event id, so redelivering an event is safe: a finished event is
//! replayed from the journal and a failed one resumes at the failed step.

pub mod definition;
pub mod event;
pub mod executor;
pub mod journal;

pub use definition::{StepDefinition, StepKind, WorkflowDefinition, DEFAULT_WORKFLOW_NAME};
pub use event::StorageEvent;
pub use executor::{RunReport, WorkflowExecutor};
pub use journal::{Journal, JournalEntry, RunStatus, StepRecord};
