//! Storage trigger events
//!
//! Two payload shapes are accepted: a flat object
//! `{"id", "bucket", "name", "generation"}` and a CloudEvent envelope whose
//! `data` carries the object fields. The event id is the idempotency key for
//! a workflow run.

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::error::{Result, WordflowError};
use crate::storage::validate_object_ref;

/// An object was finalized in a bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageEvent {
    pub id: String,
    pub bucket: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation: Option<i64>,
}

impl StorageEvent {
    /// Event with a freshly generated id
    pub fn new(bucket: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            bucket: bucket.into(),
            name: name.into(),
            generation: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_generation(mut self, generation: i64) -> Self {
        self.generation = Some(generation);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(WordflowError::invalid_event("event id must not be empty"));
        }
        validate_object_ref(&self.bucket, &self.name)
    }

    /// `bucket/name`, for log lines
    pub fn object_ref(&self) -> String {
        format!("{}/{}", self.bucket, self.name)
    }

    fn from_parts(id: Option<String>, object: ObjectPayload) -> Self {
        let generation = object.generation.and_then(GenerationField::value);
        // Without an id, an object generation still identifies the upload
        let id = id.unwrap_or_else(|| match generation {
            Some(generation) => format!("{}/{}#{}", object.bucket, object.name, generation),
            None => Uuid::new_v4().to_string(),
        });
        Self {
            id,
            bucket: object.bucket,
            name: object.name,
            generation,
        }
    }
}

#[derive(Deserialize)]
struct ObjectPayload {
    bucket: String,
    name: String,
    #[serde(default)]
    generation: Option<GenerationField>,
}

/// Storage APIs send generations as decimal strings
#[derive(Deserialize)]
#[serde(untagged)]
enum GenerationField {
    Number(i64),
    Text(String),
}

impl GenerationField {
    fn value(self) -> Option<i64> {
        match self {
            GenerationField::Number(n) => Some(n),
            GenerationField::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Deserialize)]
struct FlatEvent {
    #[serde(default)]
    id: Option<String>,
    bucket: String,
    name: String,
    #[serde(default)]
    generation: Option<GenerationField>,
}

#[derive(Deserialize)]
struct CloudEventEnvelope {
    #[serde(default)]
    id: Option<String>,
    data: ObjectPayload,
}

impl<'de> Deserialize<'de> for StorageEvent {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum EventHelper {
            CloudEvent(CloudEventEnvelope),
            Flat(FlatEvent),
        }

        Ok(match EventHelper::deserialize(deserializer)? {
            EventHelper::CloudEvent(envelope) => {
                StorageEvent::from_parts(envelope.id, envelope.data)
            }
            EventHelper::Flat(flat) => StorageEvent::from_parts(
                flat.id,
                ObjectPayload {
                    bucket: flat.bucket,
                    name: flat.name,
                    generation: flat.generation,
                },
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_event() {
        let event: StorageEvent = serde_json::from_str(
            r#"{"id":"evt-1","bucket":"uploads","name":"notes/a.txt","generation":"1714550400000"}"#,
        )
        .unwrap();
        assert_eq!(event.id, "evt-1");
        assert_eq!(event.object_ref(), "uploads/notes/a.txt");
        assert_eq!(event.generation, Some(1714550400000));
    }

    #[test]
    fn test_cloud_event_envelope() {
        let event: StorageEvent = serde_json::from_str(
            r#"{
                "specversion": "1.0",
                "id": "7d1b",
                "type": "google.cloud.storage.object.v1.finalized",
                "source": "//storage.googleapis.com/projects/_/buckets/uploads",
                "data": {"bucket": "uploads", "name": "a.txt", "generation": 42, "size": "10"}
            }"#,
        )
        .unwrap();
        assert_eq!(event.id, "7d1b");
        assert_eq!(event.bucket, "uploads");
        assert_eq!(event.generation, Some(42));
    }

    #[test]
    fn test_id_derived_from_generation() {
        let event: StorageEvent =
            serde_json::from_str(r#"{"bucket":"b","name":"n.txt","generation":7}"#).unwrap();
        assert_eq!(event.id, "b/n.txt#7");

        let event: StorageEvent = serde_json::from_str(r#"{"bucket":"b","name":"n.txt"}"#).unwrap();
        assert!(Uuid::parse_str(&event.id).is_ok());
    }

    #[test]
    fn test_serialized_event_reads_back() {
        let event = StorageEvent::new("b", "n.txt")
            .with_id("e")
            .with_generation(3);
        let json = serde_json::to_string(&event).unwrap();
        let back: StorageEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_validate() {
        assert!(StorageEvent::new("b", "n").validate().is_ok());
        assert!(StorageEvent::new("", "n").validate().is_err());
        assert!(StorageEvent::new("b", "n").with_id(" ").validate().is_err());
        assert!(serde_json::from_str::<StorageEvent>(r#"{"bucket":"b"}"#).is_err());
    }
}
