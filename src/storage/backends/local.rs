//! Directory-backed object store
//!
//! Objects live at `{root}/{bucket}/{name}`. Useful for running workflows
//! locally against files on disk.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

use crate::error::{Collaborator, Result, WordflowError};
use crate::storage::traits::ObjectStore;
use crate::storage::types::{validate_object_ref, ObjectMetadata};

pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, bucket: &str, name: &str) -> Result<PathBuf> {
        validate_object_ref(bucket, name)?;
        if !is_plain_relative(Path::new(bucket)) || bucket.contains(['/', '\\']) {
            return Err(WordflowError::invalid_event(format!(
                "invalid bucket name '{bucket}'"
            )));
        }
        if !is_plain_relative(Path::new(name)) {
            return Err(WordflowError::invalid_event(format!(
                "object name '{name}' escapes the bucket directory"
            )));
        }
        Ok(self.root.join(bucket).join(name))
    }
}

fn is_plain_relative(path: &Path) -> bool {
    path.components()
        .all(|component| matches!(component, Component::Normal(_) | Component::CurDir))
}

fn map_io_error(err: std::io::Error, bucket: &str, name: &str) -> WordflowError {
    if err.kind() == ErrorKind::NotFound {
        return WordflowError::not_found(
            Collaborator::ObjectStorage,
            format!("object {bucket}/{name} does not exist"),
        );
    }
    WordflowError::rejected(
        Collaborator::ObjectStorage,
        format!("cannot read {bucket}/{name}"),
    )
    .with_source(err)
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn metadata(&self, bucket: &str, name: &str) -> Result<ObjectMetadata> {
        let path = self.object_path(bucket, name)?;
        let meta = fs::metadata(&path)
            .await
            .map_err(|e| map_io_error(e, bucket, name))?;
        if !meta.is_file() {
            return Err(WordflowError::not_found(
                Collaborator::ObjectStorage,
                format!("{bucket}/{name} is not a file"),
            ));
        }

        let updated = meta
            .modified()
            .map(DateTime::<Utc>::from)
            .map_err(|e| map_io_error(e, bucket, name))?;

        Ok(ObjectMetadata {
            bucket: bucket.to_string(),
            name: name.to_string(),
            size_bytes: meta.len(),
            updated,
            content_type: None,
        })
    }

    async fn fetch(&self, bucket: &str, name: &str) -> Result<Vec<u8>> {
        let path = self.object_path(bucket, name)?;
        fs::read(&path)
            .await
            .map_err(|e| map_io_error(e, bucket, name))
    }

    fn describe(&self) -> String {
        format!("local object store at {}", self.root.display())
    }
}
