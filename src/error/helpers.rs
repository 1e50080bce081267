use super::{Collaborator, ErrorCode, WordflowError};
use reqwest::StatusCode;
use std::path::PathBuf;

/// Extension trait for convenient error conversion
pub trait ErrorExt<T> {
    fn to_config_error(self, message: impl Into<String>) -> Result<T, WordflowError>;
    fn to_journal_error(
        self,
        message: impl Into<String>,
        path: Option<PathBuf>,
    ) -> Result<T, WordflowError>;
}

impl<T, E> ErrorExt<T> for Result<T, E>
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    fn to_config_error(self, message: impl Into<String>) -> Result<T, WordflowError> {
        self.map_err(|e| {
            WordflowError::config_with_code(ErrorCode::CONFIG_PARSE_ERROR, message).with_source(e)
        })
    }

    fn to_journal_error(
        self,
        message: impl Into<String>,
        path: Option<PathBuf>,
    ) -> Result<T, WordflowError> {
        self.map_err(|e| WordflowError::journal(message, path).with_source(e))
    }
}

/// Statuses worth retrying: request timeout, rate limiting and server errors
pub fn is_transient_status(status: u16) -> bool {
    status == 408 || status == 429 || (500..600).contains(&status)
}

/// Classify a non-success HTTP response from a collaborator
pub fn from_status(collaborator: Collaborator, status: StatusCode, body: &str) -> WordflowError {
    let body = body.trim();
    let detail = if body.is_empty() {
        format!("HTTP {status}")
    } else {
        format!("HTTP {status}: {}", truncate(body, 512))
    };

    if status == StatusCode::NOT_FOUND {
        return WordflowError::not_found(collaborator, detail);
    }

    let error = if is_transient_status(status.as_u16()) {
        WordflowError::unavailable(collaborator, detail)
    } else {
        WordflowError::rejected(collaborator, detail)
    };
    error.with_status(status.as_u16())
}

/// Classify a transport-level failure talking to a collaborator
pub fn from_request_error(collaborator: Collaborator, err: reqwest::Error) -> WordflowError {
    if err.is_timeout() || err.is_connect() || err.is_request() {
        return WordflowError::unavailable(collaborator, format!("request failed: {err}"))
            .with_source(err);
    }
    if err.is_decode() {
        return WordflowError::Collaborator {
            code: match collaborator {
                Collaborator::ObjectStorage => ErrorCode::STORAGE_INVALID_RESPONSE,
                Collaborator::TableSink => ErrorCode::SINK_GENERIC,
            },
            message: format!("unexpected response body: {err}"),
            collaborator,
            status: None,
            transient: false,
            source: Some(Box::new(err)),
        };
    }
    WordflowError::rejected(collaborator, err.to_string()).with_source(err)
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
