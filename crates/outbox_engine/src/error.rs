//! Error types for the sync engine.

use outbox_protocol::{ApiError, ProtocolError, Response, Status};
use std::time::Duration;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur while coordinating or executing requests.
///
/// None of these escape the coordinator: executor failures are normalized
/// into a `Response` and emitted like any other result.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The transport failed before a response arrived.
    #[error("transport error: {0}")]
    Transport(String),

    /// The transport did not answer in time.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Server answered with a structured error body.
    #[error("server rejected request (status '{status}'): {code}: {message}")]
    StructuredApi {
        /// Nested status from the error body, possibly empty.
        status: Status,
        /// Error code.
        code: String,
        /// Error message.
        message: String,
    },

    /// Server answered with a non-2xx status and an unstructured body.
    #[error("unstructured server error (HTTP {status})")]
    OpaqueServer {
        /// HTTP status code.
        status: u16,
    },

    /// A 2xx response body was not valid JSON.
    #[error("malformed response body: {0}")]
    MalformedBody(String),

    /// Local synthesis had no pending request to replay.
    #[error("no pending request to synthesize")]
    LocalSynthesisNoop,

    /// The coordinator is no longer receiving intake signals.
    #[error("intake channel closed")]
    IntakeClosed,

    /// Invalid request input.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

impl SyncError {
    /// Creates a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Returns true if this error collapses into the generic failure response.
    pub fn is_generic_failure(&self) -> bool {
        !matches!(self, SyncError::StructuredApi { .. })
    }

    /// Normalizes this error into the response handed to result handlers.
    pub fn to_response(&self) -> Response {
        match self {
            SyncError::StructuredApi {
                status,
                code,
                message,
            } => Response::api_error(*status, ApiError::new(code.clone(), message.clone())),
            _ => Response::generic_failure(),
        }
    }
}
