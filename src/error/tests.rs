use super::*;
use reqwest::StatusCode;

#[test]
fn test_error_display_includes_code() {
    let err = WordflowError::config("missing endpoint");
    assert_eq!(
        err.to_string(),
        "[E1000] Configuration error: missing endpoint"
    );
    assert_eq!(err.code(), ErrorCode::CONFIG_GENERIC);
}

#[test]
fn test_status_classification() {
    let err = from_status(Collaborator::ObjectStorage, StatusCode::NOT_FOUND, "");
    assert!(matches!(err, WordflowError::NotFound { .. }));
    assert_eq!(err.code(), ErrorCode::STORAGE_NOT_FOUND);
    assert!(!err.is_transient());

    let err = from_status(
        Collaborator::TableSink,
        StatusCode::SERVICE_UNAVAILABLE,
        "try later",
    );
    assert!(err.is_transient());
    assert_eq!(err.code(), ErrorCode::SINK_UNAVAILABLE);
    assert!(err.to_string().contains("try later"));

    let err = from_status(Collaborator::TableSink, StatusCode::TOO_MANY_REQUESTS, "");
    assert!(err.is_transient());

    let err = from_status(Collaborator::TableSink, StatusCode::BAD_REQUEST, "bad row");
    assert!(!err.is_transient());
    assert_eq!(err.code(), ErrorCode::SINK_REJECTED);
    match err {
        WordflowError::Collaborator { status, .. } => assert_eq!(status, Some(400)),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_transient_statuses() {
    assert!(is_transient_status(408));
    assert!(is_transient_status(429));
    assert!(is_transient_status(500));
    assert!(is_transient_status(504));
    assert!(!is_transient_status(400));
    assert!(!is_transient_status(403));
    assert!(!is_transient_status(404));
}

#[test]
fn test_step_failed_preserves_root() {
    let inner = WordflowError::unavailable(Collaborator::TableSink, "HTTP 503");
    let err = WordflowError::step_failed("store", 3, inner);

    assert_eq!(err.code(), ErrorCode::WORKFLOW_STEP_FAILED);
    assert!(err.is_transient());
    assert!(matches!(err.root(), WordflowError::Collaborator { .. }));
    assert_eq!(err.exit_code(), 5);
    assert!(err.to_string().contains("Step 'store' failed after 3 attempt(s)"));
}

#[test]
fn test_with_source_chains() {
    let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
    let err = WordflowError::journal("cannot write", None).with_source(io);
    let source = std::error::Error::source(&err).expect("source attached");
    assert_eq!(source.to_string(), "denied");
}

#[test]
fn test_error_ext_maps_to_config() {
    let result: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        "garbage",
    ));
    let err = result.to_config_error("bad config").unwrap_err();
    assert_eq!(err.code(), ErrorCode::CONFIG_PARSE_ERROR);
    assert_eq!(err.exit_code(), 2);
}
