//! Wiring configuration into running components

use std::sync::Arc;
use tracing::{debug, info};

use crate::analyzer::TextAnalyzer;
use crate::config::AppConfig;
use crate::error::Result;
use crate::workflow::{Journal, WorkflowDefinition, WorkflowExecutor};
use crate::{sink, storage};

/// Build the workflow executor described by `config`
pub async fn build_executor(config: &AppConfig) -> Result<Arc<WorkflowExecutor>> {
    let definition = WorkflowDefinition::load_or_default(config.workflow.as_deref()).await?;
    let store = storage::from_config(&config.storage, config.request_timeout)?;
    let sink = sink::from_config(
        &config.sink,
        config.project.as_deref(),
        config.request_timeout,
    )?;

    info!(
        "Workflow '{}' ({} steps): {} -> {}",
        definition.name,
        definition.steps.len(),
        store.describe(),
        sink.describe()
    );
    debug!("Journal directory: {}", config.state_dir.display());

    let executor = WorkflowExecutor::new(
        definition,
        store,
        sink,
        TextAnalyzer::new(config.analyzer.clone()),
        config.retry.clone(),
        Journal::new(config.state_dir.clone()),
    )?;
    Ok(Arc::new(executor))
}
