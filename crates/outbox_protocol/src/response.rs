//! Responses delivered to result handlers.
//!
//! Real and locally synthesized responses share one shape, so consumers
//! cannot tell online from offline results.

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

/// Status of the generic failure response.
pub const GENERIC_FAILURE_STATUS: u16 = 400;
/// Error code of the generic failure response.
pub const GENERIC_FAILURE_CODE: &str = "400";
/// Message of the generic failure response.
pub const GENERIC_FAILURE_MESSAGE: &str = "Unable to process the request. Please try again later.";

/// Response status.
///
/// Serialized as a number, or as an empty string when a structured server
/// error carried no nested status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Status(Option<u16>);

impl Status {
    /// 200 OK.
    pub const OK: Status = Status(Some(200));

    /// Creates a status with a code.
    pub fn code(code: u16) -> Self {
        Self(Some(code))
    }

    /// The empty status.
    pub fn empty() -> Self {
        Self(None)
    }

    /// Reads a status from a JSON value (number or numeric string).
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Number(n) => Self(n.as_u64().and_then(|c| u16::try_from(c).ok())),
            Value::String(s) => Self(s.trim().parse().ok()),
            _ => Self(None),
        }
    }

    /// Returns the numeric code, if any.
    pub fn as_u16(&self) -> Option<u16> {
        self.0
    }

    /// Returns true for codes in `[200, 300)`.
    pub fn is_success(&self) -> bool {
        matches!(self.0, Some(code) if (200..300).contains(&code))
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(code) => write!(f, "{}", code),
            None => Ok(()),
        }
    }
}

impl Serialize for Status {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            Some(code) => serializer.serialize_u16(code),
            None => serializer.serialize_str(""),
        }
    }
}

impl<'de> Deserialize<'de> for Status {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        match &value {
            Value::String(s) if s.is_empty() => Ok(Status(None)),
            Value::Number(_) | Value::String(_) => {
                let status = Status::from_value(&value);
                if status.0.is_none() {
                    return Err(de::Error::custom(format!("invalid status: {}", value)));
                }
                Ok(status)
            }
            _ => Err(de::Error::custom("status must be a number or a string")),
        }
    }
}

/// Structured API error carried in a failure response's `data`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

impl ApiError {
    /// Creates an API error.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// A `{status, data}` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Status; success iff in `[200, 300)`.
    pub status: Status,
    /// Payload, or `{code, message}` on failure.
    pub data: Value,
}

impl Response {
    /// Creates a successful response.
    pub fn ok(data: Value) -> Self {
        Self {
            status: Status::OK,
            data,
        }
    }

    /// Creates a failure response carrying a structured error.
    pub fn api_error(status: Status, error: ApiError) -> Self {
        Self {
            status,
            data: json!({
                "code": error.code,
                "message": error.message,
            }),
        }
    }

    /// The fixed response every unclassifiable failure collapses into.
    pub fn generic_failure() -> Self {
        Self::api_error(
            Status::code(GENERIC_FAILURE_STATUS),
            ApiError::new(GENERIC_FAILURE_CODE, GENERIC_FAILURE_MESSAGE),
        )
    }

    /// Returns true for a success status.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Returns true if this is exactly the generic failure.
    pub fn is_generic_failure(&self) -> bool {
        *self == Self::generic_failure()
    }

    /// Extracts the structured error of a failure response.
    pub fn error(&self) -> Option<ApiError> {
        if self.is_success() {
            return None;
        }
        serde_json::from_value(self.data.clone()).ok()
    }
}
