//! Object storage collaborator interface

use async_trait::async_trait;

use super::types::ObjectMetadata;
use crate::error::Result;

/// Read access to an object store
///
/// Implementations classify their failures: a missing object is
/// `WordflowError::NotFound`, a failure worth retrying is a transient
/// `WordflowError::Collaborator`.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch size and last-modified time of an object
    async fn metadata(&self, bucket: &str, name: &str) -> Result<ObjectMetadata>;

    /// Download the full object content
    async fn fetch(&self, bucket: &str, name: &str) -> Result<Vec<u8>>;

    /// Short description for logs
    fn describe(&self) -> String;
}
