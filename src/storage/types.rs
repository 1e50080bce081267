//! Types shared by object storage backends

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, WordflowError};

/// Metadata for a stored object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMetadata {
    pub bucket: String,
    pub name: String,
    pub size_bytes: u64,
    /// Last modification time reported by the store
    pub updated: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

/// Reject empty bucket or object names before they reach a backend
pub fn validate_object_ref(bucket: &str, name: &str) -> Result<()> {
    if bucket.trim().is_empty() {
        return Err(WordflowError::invalid_event("bucket must not be empty"));
    }
    if name.trim().is_empty() {
        return Err(WordflowError::invalid_event("object name must not be empty"));
    }
    Ok(())
}
