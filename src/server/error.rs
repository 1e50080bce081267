//! JSON error responses

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use tracing::{error, warn};

use crate::error::{ErrorCode, WordflowError};

/// Error body: `{"error": "...", "code": 2001}`
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: u16,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, code: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                error: message.into(),
                code,
            },
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::OTHER_GENERIC,
            message,
        )
    }
}

/// HTTP status for a library error, judged by its innermost cause
pub fn status_for(error: &WordflowError) -> StatusCode {
    match error.root() {
        WordflowError::InputDecoding { .. } | WordflowError::InvalidInput { .. } => {
            StatusCode::BAD_REQUEST
        }
        WordflowError::NotFound { .. } => StatusCode::NOT_FOUND,
        WordflowError::Collaborator { .. } => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<WordflowError> for ApiError {
    fn from(error: WordflowError) -> Self {
        let status = status_for(&error);
        if status.is_server_error() {
            error!("Request failed: {}", error);
        } else {
            warn!("Request rejected: {}", error);
        }
        Self::new(status, error.root().code(), error.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Collaborator;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&WordflowError::decoding("bad utf-8", Some(0))),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&WordflowError::not_found(Collaborator::ObjectStorage, "gone")),
            StatusCode::NOT_FOUND
        );
        let failed = WordflowError::step_failed(
            "store",
            3,
            WordflowError::unavailable(Collaborator::TableSink, "HTTP 503"),
        );
        assert_eq!(status_for(&failed), StatusCode::BAD_GATEWAY);
        assert_eq!(
            status_for(&WordflowError::journal("disk full", None)),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_code_comes_from_root_cause() {
        let failed = WordflowError::step_failed(
            "metadata",
            1,
            WordflowError::not_found(Collaborator::ObjectStorage, "no such object"),
        );
        let api: ApiError = failed.into();
        assert_eq!(api.status, StatusCode::NOT_FOUND);
        assert_eq!(api.body.code, ErrorCode::STORAGE_NOT_FOUND);
        assert!(api.body.error.contains("metadata"));
    }
}
