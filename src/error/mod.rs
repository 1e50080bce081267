use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub mod codes;
pub mod helpers;
#[cfg(test)]
mod tests;

pub use codes::{describe_error_code, ErrorCode};
pub use helpers::{from_request_error, from_status, is_transient_status, ErrorExt};

/// Result alias used throughout the library
pub type Result<T> = std::result::Result<T, WordflowError>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// External system an error originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collaborator {
    ObjectStorage,
    TableSink,
}

impl Collaborator {
    pub fn not_found_code(self) -> u16 {
        match self {
            Collaborator::ObjectStorage => ErrorCode::STORAGE_NOT_FOUND,
            Collaborator::TableSink => ErrorCode::SINK_REJECTED,
        }
    }

    pub fn unavailable_code(self) -> u16 {
        match self {
            Collaborator::ObjectStorage => ErrorCode::STORAGE_UNAVAILABLE,
            Collaborator::TableSink => ErrorCode::SINK_UNAVAILABLE,
        }
    }

    pub fn rejected_code(self) -> u16 {
        match self {
            Collaborator::ObjectStorage => ErrorCode::STORAGE_REJECTED,
            Collaborator::TableSink => ErrorCode::SINK_REJECTED,
        }
    }
}

impl fmt::Display for Collaborator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Collaborator::ObjectStorage => write!(f, "Object storage"),
            Collaborator::TableSink => write!(f, "Table sink"),
        }
    }
}

/// The unified error type for wordflow
#[derive(Error, Debug)]
pub enum WordflowError {
    #[error("[E{code:04}] Configuration error: {message}")]
    Config {
        code: u16,
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("[E{code:04}] Input decoding error: {message}")]
    InputDecoding {
        code: u16,
        message: String,
        valid_up_to: Option<usize>,
    },

    #[error("[E{code:04}] Invalid input: {message}")]
    InvalidInput { code: u16, message: String },

    #[error("[E{code:04}] Not found: {message}")]
    NotFound {
        code: u16,
        message: String,
        collaborator: Collaborator,
    },

    #[error("[E{code:04}] {collaborator} error: {message}")]
    Collaborator {
        code: u16,
        message: String,
        collaborator: Collaborator,
        status: Option<u16>,
        transient: bool,
        #[source]
        source: Option<BoxError>,
    },

    #[error("[E{code:04}] Workflow error: {message}")]
    Workflow {
        code: u16,
        message: String,
        workflow_name: Option<String>,
        step: Option<String>,
    },

    #[error("[E{code:04}] Step '{step}' failed after {attempts} attempt(s): {source}")]
    StepFailed {
        code: u16,
        step: String,
        attempts: u32,
        #[source]
        source: Box<WordflowError>,
    },

    #[error("[E{code:04}] Journal error: {message}")]
    Journal {
        code: u16,
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<BoxError>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl WordflowError {
    /// Create a configuration error with default code
    pub fn config(message: impl Into<String>) -> Self {
        Self::config_with_code(ErrorCode::CONFIG_GENERIC, message)
    }

    /// Create a configuration error with specific code
    pub fn config_with_code(code: u16, message: impl Into<String>) -> Self {
        Self::Config {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create a decoding error for bytes that are not valid UTF-8
    pub fn decoding(message: impl Into<String>, valid_up_to: Option<usize>) -> Self {
        Self::InputDecoding {
            code: ErrorCode::INPUT_DECODING,
            message: message.into(),
            valid_up_to,
        }
    }

    pub fn invalid_event(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            code: ErrorCode::INPUT_INVALID_EVENT,
            message: message.into(),
        }
    }

    /// Create a not found error for a collaborator resource
    pub fn not_found(collaborator: Collaborator, message: impl Into<String>) -> Self {
        Self::NotFound {
            code: collaborator.not_found_code(),
            message: message.into(),
            collaborator,
        }
    }

    /// Create a collaborator error that may be retried
    pub fn unavailable(collaborator: Collaborator, message: impl Into<String>) -> Self {
        Self::Collaborator {
            code: collaborator.unavailable_code(),
            message: message.into(),
            collaborator,
            status: None,
            transient: true,
            source: None,
        }
    }

    /// Create a collaborator error that must not be retried
    pub fn rejected(collaborator: Collaborator, message: impl Into<String>) -> Self {
        Self::Collaborator {
            code: collaborator.rejected_code(),
            message: message.into(),
            collaborator,
            status: None,
            transient: false,
            source: None,
        }
    }

    pub fn workflow_with_code(code: u16, message: impl Into<String>) -> Self {
        Self::Workflow {
            code,
            message: message.into(),
            workflow_name: None,
            step: None,
        }
    }

    /// Create an invalid workflow definition error
    pub fn invalid_workflow(workflow_name: Option<String>, message: impl Into<String>) -> Self {
        Self::Workflow {
            code: ErrorCode::WORKFLOW_INVALID_DEFINITION,
            message: message.into(),
            workflow_name,
            step: None,
        }
    }

    /// Wrap the final error of a step that exhausted its retries
    pub fn step_failed(step: impl Into<String>, attempts: u32, source: WordflowError) -> Self {
        Self::StepFailed {
            code: ErrorCode::WORKFLOW_STEP_FAILED,
            step: step.into(),
            attempts,
            source: Box::new(source),
        }
    }

    pub fn journal(message: impl Into<String>, path: Option<PathBuf>) -> Self {
        Self::Journal {
            code: ErrorCode::WORKFLOW_JOURNAL_ERROR,
            message: message.into(),
            path,
            source: None,
        }
    }

    /// Attach an HTTP status to a collaborator error
    pub fn with_status(mut self, status_code: u16) -> Self {
        if let Self::Collaborator { status, .. } = &mut self {
            *status = Some(status_code);
        }
        self
    }

    /// Add a source error to the chain
    pub fn with_source(mut self, error: impl Into<BoxError>) -> Self {
        match &mut self {
            Self::Config { source, .. }
            | Self::Collaborator { source, .. }
            | Self::Journal { source, .. } => *source = Some(error.into()),
            _ => {}
        }
        self
    }

    /// Numeric error code
    pub fn code(&self) -> u16 {
        match self {
            Self::Config { code, .. }
            | Self::InputDecoding { code, .. }
            | Self::InvalidInput { code, .. }
            | Self::NotFound { code, .. }
            | Self::Collaborator { code, .. }
            | Self::Workflow { code, .. }
            | Self::StepFailed { code, .. }
            | Self::Journal { code, .. } => *code,
            Self::Io(_) => ErrorCode::OTHER_IO,
            Self::Serialization(_) | Self::Yaml(_) => ErrorCode::OTHER_SERIALIZATION,
        }
    }

    /// Whether retrying the failed operation could succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Collaborator { transient, .. } => *transient,
            Self::StepFailed { source, .. } => source.is_transient(),
            _ => false,
        }
    }

    /// The innermost error, looking through step failures
    pub fn root(&self) -> &WordflowError {
        match self {
            Self::StepFailed { source, .. } => source.root(),
            other => other,
        }
    }

    /// Process exit code for the CLI
    pub fn exit_code(&self) -> i32 {
        match self.root() {
            Self::Config { .. } | Self::Workflow { .. } => 2,
            Self::InputDecoding { .. } | Self::InvalidInput { .. } => 3,
            Self::NotFound { .. } => 4,
            Self::Collaborator { .. } => 5,
            _ => 1,
        }
    }
}
