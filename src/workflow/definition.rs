//! Workflow definitions
//!
//! A workflow is an ordered list of steps. Each step names one of the fixed
//! operations in [`StepKind`] and may override the global retry policy:
//!
//! ```yaml
//! name: analyze-uploaded-file
//! steps:
//!   - id: metadata
//!     call: fetch_metadata
//!   - fetch_content          # shorthand, the id defaults to the call name
//!   - id: analysis
//!     call: analyze
//!   - id: store
//!     call: insert_row
//!     retry: { attempts: 5 }
//! ```

use serde::{Deserialize, Deserializer, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use crate::error::{ErrorCode, Result, WordflowError};
use crate::retry::{RetryOverride, RetryPolicy};

pub const DEFAULT_WORKFLOW_NAME: &str = "analyze-uploaded-file";

/// Operation performed by a workflow step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    FetchMetadata,
    FetchContent,
    Analyze,
    InsertRow,
}

impl StepKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StepKind::FetchMetadata => "fetch_metadata",
            StepKind::FetchContent => "fetch_content",
            StepKind::Analyze => "analyze",
            StepKind::InsertRow => "insert_row",
        }
    }

    /// Step kinds that must appear earlier in the workflow
    pub fn prerequisites(self) -> &'static [StepKind] {
        match self {
            StepKind::FetchMetadata | StepKind::FetchContent => &[],
            StepKind::Analyze => &[StepKind::FetchContent],
            StepKind::InsertRow => &[StepKind::FetchMetadata, StepKind::Analyze],
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepDefinition {
    pub id: String,
    pub call: StepKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryOverride>,
}

impl StepDefinition {
    pub fn new(id: impl Into<String>, call: StepKind) -> Self {
        Self {
            id: id.into(),
            call,
            retry: None,
        }
    }

    pub fn with_retry(mut self, retry: RetryOverride) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Effective retry policy for this step
    pub fn policy(&self, base: &RetryPolicy) -> RetryPolicy {
        base.merged(self.retry.as_ref())
    }
}

impl<'de> Deserialize<'de> for StepDefinition {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(deny_unknown_fields)]
        struct FullStep {
            id: Option<String>,
            call: StepKind,
            #[serde(default)]
            retry: Option<RetryOverride>,
        }

        #[derive(Deserialize)]
        #[serde(untagged)]
        enum StepHelper {
            // `- analyze`
            Shorthand(StepKind),
            // `- id: analysis` / `call: analyze`
            Full(FullStep),
        }

        Ok(match StepHelper::deserialize(deserializer)? {
            StepHelper::Shorthand(call) => StepDefinition::new(call.as_str(), call),
            StepHelper::Full(FullStep { id, call, retry }) => StepDefinition {
                id: id.unwrap_or_else(|| call.as_str().to_string()),
                call,
                retry,
            },
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkflowDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub steps: Vec<StepDefinition>,
}

impl Default for WorkflowDefinition {
    /// Fetch metadata and content, analyze, insert one row
    fn default() -> Self {
        Self {
            name: DEFAULT_WORKFLOW_NAME.to_string(),
            description: Some(
                "Count the words of an uploaded object and record the result".to_string(),
            ),
            steps: vec![
                StepDefinition::new("metadata", StepKind::FetchMetadata),
                StepDefinition::new("content", StepKind::FetchContent),
                StepDefinition::new("analysis", StepKind::Analyze),
                StepDefinition::new("store", StepKind::InsertRow),
            ],
        }
    }
}

impl WorkflowDefinition {
    /// Parse and validate a YAML definition
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let definition: WorkflowDefinition = serde_yaml::from_str(content).map_err(|e| {
            WordflowError::invalid_workflow(None, format!("invalid workflow YAML: {e}"))
        })?;
        definition.validate()?;
        Ok(definition)
    }

    /// Load a definition from disk
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            WordflowError::workflow_with_code(
                ErrorCode::WORKFLOW_INVALID_DEFINITION,
                format!("failed to read workflow {}: {e}", path.display()),
            )
        })?;
        Self::from_yaml_str(&content)
    }

    /// Load `path` when given, otherwise use the built-in workflow
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path).await,
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |message: String| {
            WordflowError::invalid_workflow(Some(self.name.clone()), message)
        };

        if self.name.trim().is_empty() {
            return Err(invalid("workflow name must not be empty".to_string()));
        }
        if self.steps.is_empty() {
            return Err(invalid(format!("workflow '{}' has no steps", self.name)));
        }

        let mut ids = HashSet::new();
        let mut seen = HashSet::new();
        for step in &self.steps {
            if step.id.trim().is_empty() {
                return Err(invalid(format!("a '{}' step has an empty id", step.call)));
            }
            if !ids.insert(step.id.as_str()) {
                return Err(invalid(format!("duplicate step id '{}'", step.id)));
            }
            if let Some(missing) = step
                .call
                .prerequisites()
                .iter()
                .find(|kind| !seen.contains(*kind))
            {
                return Err(invalid(format!(
                    "step '{}' ({}) needs an earlier {} step",
                    step.id, step.call, missing
                )));
            }
            if step.retry.is_some() {
                step.policy(&RetryPolicy::default()).validate().map_err(|e| {
                    invalid(format!("step '{}' has an invalid retry override: {e}", step.id))
                })?;
            }
            seen.insert(step.call);
        }
        Ok(())
    }

    /// Stable content hash; a journal written under another hash is stale
    pub fn hash(&self) -> String {
        let mut hasher = Sha256::new();
        let canonical = serde_json::to_vec(self).unwrap_or_default();
        hasher.update(&canonical);
        format!("{:x}", hasher.finalize())
    }

    pub fn step(&self, id: &str) -> Option<&StepDefinition> {
        self.steps.iter().find(|s| s.id == id)
    }

    pub fn contains(&self, kind: StepKind) -> bool {
        self.steps.iter().any(|s| s.call == kind)
    }
}
