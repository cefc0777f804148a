//! Queued requests.

use crate::entity_id::EntityId;
use crate::error::{ProtocolError, ProtocolResult};
use crate::kind::RequestKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Body field holding an entity's identity.
pub const IDENTITY_FIELD: &str = "ID";

/// HTTP method of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// PATCH
    Patch,
    /// DELETE
    Delete,
}

impl Method {
    /// Returns the method name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl FromStr for Method {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "PATCH" => Ok(Method::Patch),
            "DELETE" => Ok(Method::Delete),
            _ => Err(ProtocolError::UnsupportedMethod(s.to_string())),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unique handle of a queued request, assigned at admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Generates a fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The fields used to recognize the same operation across admissions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestIdentity {
    /// Action name; doubles as the result-handler action.
    pub action: String,
    /// Target url.
    pub url: String,
    /// HTTP method.
    pub method: Method,
}

/// A client-originated operation waiting in the queue.
///
/// Requests are immutable once admitted. The coordinator only reads them;
/// the executor works on a prepared copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Queue handle.
    pub id: RequestId,
    /// Action, url and method.
    #[serde(flatten)]
    pub identity: RequestIdentity,
    /// Admission-time classification.
    pub kind: RequestKind,
    /// JSON body, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    /// Extra headers sent with the request.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    /// Admission time in milliseconds since the Unix epoch.
    pub queued_at: u64,
}

impl Request {
    /// Creates a request with an explicit kind.
    pub fn new(
        action: impl Into<String>,
        url: impl Into<String>,
        method: Method,
        kind: RequestKind,
    ) -> Self {
        Self {
            id: RequestId::new(),
            identity: RequestIdentity {
                action: action.into(),
                url: url.into(),
                method,
            },
            kind,
            body: None,
            headers: BTreeMap::new(),
            queued_at: now_millis(),
        }
    }

    /// Creates a request whose kind is derived from a `<ENTITY>_<VERB>`
    /// action name.
    pub fn from_action(action: impl Into<String>, url: impl Into<String>, method: Method) -> Self {
        let action = action.into();
        let url = url.into();
        let kind = RequestKind::from_action(&action, method, &url);
        Self::new(action, url, method, kind)
    }

    /// Sets the JSON body.
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Adds a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Overrides the admission timestamp.
    pub fn with_queued_at(mut self, queued_at: u64) -> Self {
        self.queued_at = queued_at;
        self
    }

    /// Validates the fields every request needs.
    pub fn validate(&self) -> ProtocolResult<()> {
        if self.identity.url.trim().is_empty() {
            return Err(ProtocolError::MissingField("url"));
        }
        Ok(())
    }

    /// Action name.
    pub fn action(&self) -> &str {
        &self.identity.action
    }

    /// Target url.
    pub fn url(&self) -> &str {
        &self.identity.url
    }

    /// HTTP method.
    pub fn method(&self) -> Method {
        self.identity.method
    }

    /// Result-handler action name, if the request has one.
    pub fn handler(&self) -> Option<&str> {
        let action = self.identity.action.as_str();
        (!action.is_empty()).then_some(action)
    }

    /// Raw identity value from the body (`body.ID`).
    pub fn body_identity(&self) -> Option<&Value> {
        self.body.as_ref()?.get(IDENTITY_FIELD)
    }

    /// Classified identity from the body.
    pub fn entity_id(&self) -> Option<EntityId> {
        self.body_identity().and_then(EntityId::from_value)
    }

    /// Returns true for a by-identity GET whose target was never synced.
    ///
    /// Such requests can only be answered locally.
    pub fn targets_provisional_entity(&self) -> bool {
        self.identity.method == Method::Get
            && self
                .kind
                .target_id()
                .is_some_and(|id| id.is_provisional())
    }

    /// Returns true if `other` is the same pending operation.
    ///
    /// Creates compare `{action, url, method, body.ID}`; every other kind
    /// compares `{action, url, method}`.
    pub fn is_duplicate_of(&self, other: &Request) -> bool {
        if self.identity != other.identity {
            return false;
        }
        if self.kind.is_create() || other.kind.is_create() {
            return self.body_identity() == other.body_identity();
        }
        true
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
