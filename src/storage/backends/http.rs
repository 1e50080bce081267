//! HTTP object store speaking the JSON object API
//!
//! Metadata is read from `GET {endpoint}/b/{bucket}/o/{name}` and content
//! from the same URL with `?alt=media`. The object name is sent as a single
//! percent-encoded path segment, so `a/b.txt` becomes `a%2Fb.txt`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::error::{
    from_request_error, from_status, Collaborator, ErrorCode, Result, WordflowError,
};
use crate::storage::traits::ObjectStore;
use crate::storage::types::{validate_object_ref, ObjectMetadata};

const COLLABORATOR: Collaborator = Collaborator::ObjectStorage;

pub struct HttpObjectStore {
    client: Client,
    endpoint: Url,
}

impl HttpObjectStore {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let endpoint = parse_base_url(endpoint)?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| WordflowError::config("Failed to create HTTP client").with_source(e))?;

        Ok(Self { client, endpoint })
    }

    fn object_url(&self, bucket: &str, name: &str) -> Result<Url> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| {
                WordflowError::config(format!("endpoint {} cannot be a base URL", self.endpoint))
            })?
            .pop_if_empty()
            .extend(["b", bucket, "o", name]);
        Ok(url)
    }

    async fn get(&self, url: Url) -> Result<reqwest::Response> {
        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| from_request_error(COLLABORATOR, e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(from_status(COLLABORATOR, status, &body))
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn metadata(&self, bucket: &str, name: &str) -> Result<ObjectMetadata> {
        validate_object_ref(bucket, name)?;
        let url = self.object_url(bucket, name)?;
        let resource: ObjectResource = self
            .get(url)
            .await?
            .json()
            .await
            .map_err(|e| from_request_error(COLLABORATOR, e))?;

        let size_bytes = resource.size.as_u64().ok_or_else(|| WordflowError::Collaborator {
            code: ErrorCode::STORAGE_INVALID_RESPONSE,
            message: format!("object {bucket}/{name} reported a non-numeric size"),
            collaborator: COLLABORATOR,
            status: None,
            transient: false,
            source: None,
        })?;

        Ok(ObjectMetadata {
            bucket: resource.bucket.unwrap_or_else(|| bucket.to_string()),
            name: resource.name.unwrap_or_else(|| name.to_string()),
            size_bytes,
            updated: resource.updated,
            content_type: resource.content_type,
        })
    }

    async fn fetch(&self, bucket: &str, name: &str) -> Result<Vec<u8>> {
        validate_object_ref(bucket, name)?;
        let mut url = self.object_url(bucket, name)?;
        url.query_pairs_mut().append_pair("alt", "media");

        let bytes = self
            .get(url)
            .await?
            .bytes()
            .await
            .map_err(|e| from_request_error(COLLABORATOR, e))?;
        Ok(bytes.to_vec())
    }

    fn describe(&self) -> String {
        format!("http object store at {}", self.endpoint)
    }
}

/// Parse an endpoint that later gets path segments appended
pub(crate) fn parse_base_url(endpoint: &str) -> Result<Url> {
    let url = Url::parse(endpoint).map_err(|e| {
        WordflowError::config_with_code(
            ErrorCode::CONFIG_INVALID_VALUE,
            format!("invalid endpoint URL '{endpoint}'"),
        )
        .with_source(e)
    })?;
    if url.cannot_be_a_base() {
        return Err(WordflowError::config_with_code(
            ErrorCode::CONFIG_INVALID_VALUE,
            format!("endpoint '{endpoint}' cannot be used as a base URL"),
        ));
    }
    Ok(url)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectResource {
    bucket: Option<String>,
    name: Option<String>,
    size: SizeField,
    updated: DateTime<Utc>,
    content_type: Option<String>,
}

/// The object API sends sizes as decimal strings; accept plain numbers too
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SizeField {
    Number(u64),
    Text(String),
}

impl SizeField {
    fn as_u64(&self) -> Option<u64> {
        match self {
            SizeField::Number(n) => Some(*n),
            SizeField::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(endpoint: &str) -> HttpObjectStore {
        HttpObjectStore::new(endpoint, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_object_url_encodes_name_as_one_segment() {
        let store = store("https://storage.example.com/storage/v1");
        let url = store.object_url("uploads", "reports/2024 q1.txt").unwrap();
        assert_eq!(
            url.as_str(),
            "https://storage.example.com/storage/v1/b/uploads/o/reports%2F2024%20q1.txt"
        );
    }

    #[test]
    fn test_object_url_with_trailing_slash() {
        let store = store("http://127.0.0.1:9000/");
        let url = store.object_url("b", "n").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:9000/b/b/o/n");
    }

    #[test]
    fn test_rejects_non_base_endpoints() {
        assert!(HttpObjectStore::new("mailto:ops@example.com", Duration::from_secs(1)).is_err());
        assert!(HttpObjectStore::new("not a url", Duration::from_secs(1)).is_err());
    }

    #[test]
    fn test_size_field_variants() {
        let text: ObjectResource = serde_json::from_str(
            r#"{"size":"42","updated":"2024-01-02T03:04:05Z","contentType":"text/plain"}"#,
        )
        .unwrap();
        assert_eq!(text.size.as_u64(), Some(42));
        assert_eq!(text.content_type.as_deref(), Some("text/plain"));

        let number: ObjectResource =
            serde_json::from_str(r#"{"size":7,"updated":"2024-01-02T03:04:05Z"}"#).unwrap();
        assert_eq!(number.size.as_u64(), Some(7));

        let bad: ObjectResource =
            serde_json::from_str(r#"{"size":"lots","updated":"2024-01-02T03:04:05Z"}"#).unwrap();
        assert_eq!(bad.size.as_u64(), None);
    }
}
