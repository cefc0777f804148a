//! Entity identity classification.
//!
//! Entities created while offline carry a client-generated provisional id
//! until the server assigns the authoritative one. Server ids are numeric;
//! anything else is provisional.

use serde_json::Value;
use std::fmt;

/// An entity identity value found in a request body or url.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityId {
    /// Server-assigned numeric identity.
    Server(String),
    /// Client-assigned identity for an entity that was never synced.
    Provisional(String),
}

impl EntityId {
    /// Classifies a textual identity (e.g. a url path segment).
    ///
    /// Returns `None` for empty input.
    pub fn parse(text: &str) -> Option<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }
        if is_server_id(trimmed) {
            Some(EntityId::Server(trimmed.to_string()))
        } else {
            Some(EntityId::Provisional(text.to_string()))
        }
    }

    /// Classifies a JSON identity value taken from a request body.
    ///
    /// Numbers are server ids, strings are classified by content. `null`,
    /// empty strings and non-scalar values carry no identity.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => Some(EntityId::Server(n.to_string())),
            Value::String(s) => Self::parse(s),
            _ => None,
        }
    }

    /// Returns true for a client-assigned identity.
    pub fn is_provisional(&self) -> bool {
        matches!(self, EntityId::Provisional(_))
    }

    /// Returns the identity text.
    pub fn as_str(&self) -> &str {
        match self {
            EntityId::Server(id) | EntityId::Provisional(id) => id,
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns true if `text` has the server's numeric id format.
pub fn is_server_id(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return false;
    }
    match trimmed.parse::<f64>() {
        Ok(n) => n.is_finite(),
        Err(_) => false,
    }
}
