use thiserror::Error;

/// A record or field that failed domain validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    #[error("{field} must be between {min} and {max} (got {value})")]
    OutOfRange {
        field: String,
        value: i64,
        min: i64,
        max: i64,
    },

    #[error("unknown movement kind: {0}")]
    UnknownMovementKind(String),

    #[error("invalid date '{0}': expected RFC 3339 or YYYY-MM-DD")]
    InvalidDate(String),
}

/// Failure while reading a sequence of raw transaction records.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("transaction input is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("transaction input must be a JSON array")]
    NotAnArray,

    #[error("record {index} is malformed: {reason}")]
    MalformedRecord { index: usize, reason: String },

    #[error("record {index} is invalid: {source}")]
    InvalidRecord {
        index: usize,
        #[source]
        source: ValidationError,
    },
}
