//! Error types for protocol parsing.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors raised while building or parsing protocol values.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// HTTP method is not one the coordinator understands.
    #[error("unsupported method: {0}")]
    UnsupportedMethod(String),

    /// A required field was missing or empty.
    #[error("missing field: {0}")]
    MissingField(&'static str),

    /// Request body could not be decoded as JSON.
    #[error("invalid request body: {0}")]
    InvalidBody(String),

    /// JSON (de)serialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProtocolError {
    /// Returns true if the error was caused by the caller's input rather than
    /// by the JSON layer itself.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            ProtocolError::UnsupportedMethod(_)
                | ProtocolError::MissingField(_)
                | ProtocolError::InvalidBody(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ProtocolError::UnsupportedMethod("TRACE".into());
        assert_eq!(err.to_string(), "unsupported method: TRACE");

        let err = ProtocolError::MissingField("url");
        assert!(err.to_string().contains("url"));
    }

    #[test]
    fn input_errors() {
        assert!(ProtocolError::MissingField("action").is_invalid_input());
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(!ProtocolError::from(json_err).is_invalid_input());
    }
}
