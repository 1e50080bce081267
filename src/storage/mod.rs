//! Object storage collaborators
//!
//! The workflow reads object metadata and content through the
//! [`ObjectStore`] trait. Backends:
//! - [`HttpObjectStore`] talks to a JSON object API (`/b/{bucket}/o/{name}`)
//! - [`LocalObjectStore`] serves a directory tree, one subdirectory per bucket
//! - [`MemoryObjectStore`] keeps objects in memory for tests

pub mod backends;
pub mod traits;
pub mod types;

pub use backends::{HttpObjectStore, LocalObjectStore, MemoryObjectStore};
pub use traits::ObjectStore;
pub use types::{validate_object_ref, ObjectMetadata};

use std::sync::Arc;
use std::time::Duration;

use crate::config::StorageConfig;
use crate::error::Result;

/// Build the object store selected in configuration
pub fn from_config(config: &StorageConfig, timeout: Duration) -> Result<Arc<dyn ObjectStore>> {
    Ok(match config {
        StorageConfig::Http { endpoint } => Arc::new(HttpObjectStore::new(endpoint, timeout)?),
        StorageConfig::Local { root } => Arc::new(LocalObjectStore::new(root.clone())),
    })
}
