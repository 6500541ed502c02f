//! Error types for the collection cache

use thiserror::Error;

/// Result type for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;

/// Collection cache error
#[derive(Error, Debug)]
pub enum CacheError {
    /// Backend answered with a status outside 2xx
    #[error("Backend error {status} for {path}")]
    Backend { path: String, status: u16 },

    /// Response body is not a JSON array of records
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// A record lacks the nested `_id.$oid` identifier
    #[error("Malformed record at index {index}: {reason}")]
    MalformedRecord { index: usize, reason: String },

    /// The system collection carries no usable revision
    #[error("System collection has no revision")]
    MissingSystemConfig,

    /// Collection names must be non-empty
    #[error("Invalid collection name: {0:?}")]
    InvalidName(String),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Durable store failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sled::Error> for CacheError {
    fn from(err: sled::Error) -> Self {
        CacheError::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_display() {
        let err = CacheError::Backend {
            path: "/users.json".to_string(),
            status: 404,
        };
        assert_eq!(err.to_string(), "Backend error 404 for /users.json");
    }

    #[test]
    fn test_json_error_conversion() {
        let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str("{");
        let err: CacheError = parse.unwrap_err().into();
        assert!(matches!(err, CacheError::Json(_)));
    }
}
