/// Error code registry for wordflow
///
/// Error codes are organized by category:
/// - 1000-1999: Configuration errors
/// - 2000-2999: Input errors
/// - 3000-3999: Object storage errors
/// - 4000-4999: Table sink errors
/// - 5000-5999: Workflow errors
/// - 9000-9999: Other errors
#[allow(dead_code)]
pub struct ErrorCode;

impl ErrorCode {
    // Configuration errors (1000-1999)
    pub const CONFIG_GENERIC: u16 = 1000;
    pub const CONFIG_NOT_FOUND: u16 = 1001;
    pub const CONFIG_PARSE_ERROR: u16 = 1002;
    pub const CONFIG_INVALID_VALUE: u16 = 1003;
    pub const CONFIG_UNKNOWN_PLACEHOLDER: u16 = 1004;

    // Input errors (2000-2999)
    pub const INPUT_GENERIC: u16 = 2000;
    pub const INPUT_DECODING: u16 = 2001;
    pub const INPUT_INVALID_EVENT: u16 = 2002;

    // Object storage errors (3000-3999)
    pub const STORAGE_GENERIC: u16 = 3000;
    pub const STORAGE_NOT_FOUND: u16 = 3001;
    pub const STORAGE_UNAVAILABLE: u16 = 3002;
    pub const STORAGE_INVALID_RESPONSE: u16 = 3003;
    pub const STORAGE_REJECTED: u16 = 3004;

    // Table sink errors (4000-4999)
    pub const SINK_GENERIC: u16 = 4000;
    pub const SINK_UNAVAILABLE: u16 = 4001;
    pub const SINK_REJECTED: u16 = 4002;
    pub const SINK_INSERT_ERRORS: u16 = 4003;

    // Workflow errors (5000-5999)
    pub const WORKFLOW_GENERIC: u16 = 5000;
    pub const WORKFLOW_INVALID_DEFINITION: u16 = 5001;
    pub const WORKFLOW_STEP_FAILED: u16 = 5002;
    pub const WORKFLOW_JOURNAL_ERROR: u16 = 5003;
    pub const WORKFLOW_MISSING_INPUT: u16 = 5004;

    // Other errors (9000-9999)
    pub const OTHER_GENERIC: u16 = 9000;
    pub const OTHER_IO: u16 = 9001;
    pub const OTHER_SERIALIZATION: u16 = 9002;
}

/// Get a human-readable description for an error code
pub fn describe_error_code(code: u16) -> &'static str {
    match code {
        ErrorCode::CONFIG_GENERIC => "General configuration error",
        ErrorCode::CONFIG_NOT_FOUND => "Configuration file not found",
        ErrorCode::CONFIG_PARSE_ERROR => "Configuration file could not be parsed",
        ErrorCode::CONFIG_INVALID_VALUE => "Invalid configuration value",
        ErrorCode::CONFIG_UNKNOWN_PLACEHOLDER => "Unknown placeholder in endpoint template",

        ErrorCode::INPUT_GENERIC => "General input error",
        ErrorCode::INPUT_DECODING => "Input bytes are not valid text",
        ErrorCode::INPUT_INVALID_EVENT => "Storage event payload is invalid",

        ErrorCode::STORAGE_GENERIC => "General object storage error",
        ErrorCode::STORAGE_NOT_FOUND => "Object not found",
        ErrorCode::STORAGE_UNAVAILABLE => "Object storage temporarily unavailable",
        ErrorCode::STORAGE_INVALID_RESPONSE => "Object storage returned an unexpected response",
        ErrorCode::STORAGE_REJECTED => "Object storage rejected the request",

        ErrorCode::SINK_GENERIC => "General table sink error",
        ErrorCode::SINK_UNAVAILABLE => "Table sink temporarily unavailable",
        ErrorCode::SINK_REJECTED => "Table sink rejected the request",
        ErrorCode::SINK_INSERT_ERRORS => "Table sink reported row insert errors",

        ErrorCode::WORKFLOW_GENERIC => "General workflow error",
        ErrorCode::WORKFLOW_INVALID_DEFINITION => "Workflow definition is invalid",
        ErrorCode::WORKFLOW_STEP_FAILED => "Workflow step failed",
        ErrorCode::WORKFLOW_JOURNAL_ERROR => "Workflow journal could not be read or written",
        ErrorCode::WORKFLOW_MISSING_INPUT => "Workflow step is missing an input from an earlier step",

        ErrorCode::OTHER_IO => "I/O error",
        ErrorCode::OTHER_SERIALIZATION => "Serialization error",
        _ => "Unknown error",
    }
}
