//! Table sink using the streaming `insertAll` API
//!
//! Rows are POSTed to
//! `{endpoint}/projects/{project}/datasets/{dataset}/tables/{table}/insertAll`.
//! The insert id is passed through as `insertId`, which the table service uses
//! for best-effort de-duplication.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::{AnalysisRecord, AnalysisSink};
use crate::error::{
    from_request_error, from_status, Collaborator, ErrorCode, Result, WordflowError,
};
use crate::storage::backends::http::parse_base_url;

const COLLABORATOR: Collaborator = Collaborator::TableSink;

pub struct HttpTableSink {
    client: Client,
    insert_url: Url,
}

impl HttpTableSink {
    pub fn new(
        endpoint: &str,
        project: Option<&str>,
        dataset: &str,
        table: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let project = project.filter(|p| !p.trim().is_empty()).ok_or_else(|| {
            WordflowError::config_with_code(
                ErrorCode::CONFIG_INVALID_VALUE,
                "the http table sink requires `project` to be set",
            )
        })?;

        let mut insert_url = parse_base_url(endpoint)?;
        insert_url
            .path_segments_mut()
            .map_err(|_| {
                WordflowError::config(format!("endpoint {endpoint} cannot be a base URL"))
            })?
            .pop_if_empty()
            .extend([
                "projects", project, "datasets", dataset, "tables", table, "insertAll",
            ]);

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| WordflowError::config("Failed to create HTTP client").with_source(e))?;

        Ok(Self { client, insert_url })
    }

    pub fn insert_url(&self) -> &Url {
        &self.insert_url
    }
}

#[derive(Debug, Serialize)]
struct InsertAllRequest<'a> {
    rows: Vec<InsertRow<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InsertRow<'a> {
    insert_id: &'a str,
    json: &'a AnalysisRecord,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InsertAllResponse {
    #[serde(default)]
    insert_errors: Vec<RowErrors>,
}

#[derive(Debug, Deserialize)]
struct RowErrors {
    #[serde(default)]
    index: u64,
    #[serde(default)]
    errors: Vec<ErrorProto>,
}

#[derive(Debug, Deserialize)]
struct ErrorProto {
    reason: Option<String>,
    message: Option<String>,
}

impl InsertAllResponse {
    fn describe_errors(&self) -> String {
        self.insert_errors
            .iter()
            .flat_map(|row| {
                row.errors.iter().map(move |e| {
                    format!(
                        "row {}: {} ({})",
                        row.index,
                        e.message.as_deref().unwrap_or("no message"),
                        e.reason.as_deref().unwrap_or("unknown")
                    )
                })
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[async_trait]
impl AnalysisSink for HttpTableSink {
    async fn insert_row(&self, insert_id: &str, record: &AnalysisRecord) -> Result<()> {
        let request = InsertAllRequest {
            rows: vec![InsertRow {
                insert_id,
                json: record,
            }],
        };

        debug!("POST {} insertId={}", self.insert_url, insert_id);
        let response = self
            .client
            .post(self.insert_url.clone())
            .json(&request)
            .send()
            .await
            .map_err(|e| from_request_error(COLLABORATOR, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| from_request_error(COLLABORATOR, e))?;
        if !status.is_success() {
            return Err(from_status(COLLABORATOR, status, &body));
        }

        let parsed: InsertAllResponse = if body.trim().is_empty() {
            InsertAllResponse::default()
        } else {
            serde_json::from_str(&body).map_err(|e| {
                WordflowError::rejected(COLLABORATOR, "unparseable insertAll response")
                    .with_source(e)
            })?
        };

        if !parsed.insert_errors.is_empty() {
            return Err(WordflowError::Collaborator {
                code: ErrorCode::SINK_INSERT_ERRORS,
                message: format!("insert rejected: {}", parsed.describe_errors()),
                collaborator: COLLABORATOR,
                status: Some(status.as_u16()),
                transient: false,
                source: None,
            });
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("http table sink at {}", self.insert_url)
    }
}
