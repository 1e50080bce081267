//! In-memory object store for testing

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::error::{Collaborator, Result, WordflowError};
use crate::storage::traits::ObjectStore;
use crate::storage::types::ObjectMetadata;

/// In-memory object store with call counters and failure injection
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<(String, String), (ObjectMetadata, Vec<u8>)>>,
    failures: Mutex<VecDeque<WordflowError>>,
    metadata_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an object with the given modification time
    pub fn put(
        &self,
        bucket: &str,
        name: &str,
        content: impl Into<Vec<u8>>,
        updated: DateTime<Utc>,
    ) {
        let content = content.into();
        let meta = ObjectMetadata {
            bucket: bucket.to_string(),
            name: name.to_string(),
            size_bytes: content.len() as u64,
            updated,
            content_type: Some("text/plain".to_string()),
        };
        self.objects
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert((bucket.to_string(), name.to_string()), (meta, content));
    }

    /// Fail the next call (metadata or fetch) with `error`
    pub fn fail_next(&self, error: WordflowError) {
        self.failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(error);
    }

    pub fn metadata_calls(&self) -> usize {
        self.metadata_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    fn take_failure(&self) -> Option<WordflowError> {
        self.failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
    }

    fn lookup(&self, bucket: &str, name: &str) -> Result<(ObjectMetadata, Vec<u8>)> {
        self.objects
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&(bucket.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| {
                WordflowError::not_found(
                    Collaborator::ObjectStorage,
                    format!("object {bucket}/{name} does not exist"),
                )
            })
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn metadata(&self, bucket: &str, name: &str) -> Result<ObjectMetadata> {
        self.metadata_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.take_failure() {
            return Err(err);
        }
        self.lookup(bucket, name).map(|(meta, _)| meta)
    }

    async fn fetch(&self, bucket: &str, name: &str) -> Result<Vec<u8>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.take_failure() {
            return Err(err);
        }
        self.lookup(bucket, name).map(|(_, content)| content)
    }

    fn describe(&self) -> String {
        "in-memory object store".to_string()
    }
}
