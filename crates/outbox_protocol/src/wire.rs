//! Legacy JSON intake format.
//!
//! Callers that persist or forward requests outside the coordinator use the
//! `{action, url, data: {method, body?, headers?}}` shape, with `body` being a
//! JSON-encoded string. Converting into a `Request` assigns the kind once.

use crate::error::{ProtocolError, ProtocolResult};
use crate::request::{Method, Request};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Request as exchanged with callers and queue files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireRequest {
    /// Action name.
    #[serde(default)]
    pub action: String,
    /// Target url.
    pub url: String,
    /// Method, body and headers.
    pub data: WireData,
}

/// The `data` part of a wire request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireData {
    /// HTTP method name.
    pub method: String,
    /// Body, as a JSON string or inline JSON.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    /// Extra headers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,
}

impl WireRequest {
    /// Parses one wire request from JSON text.
    pub fn from_json(text: &str) -> ProtocolResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Admits this wire request as a `Request`.
    pub fn into_request(self) -> ProtocolResult<Request> {
        let method: Method = self.data.method.parse()?;
        let mut request = Request::from_action(self.action, self.url, method);

        if let Some(body) = self.data.body {
            request.body = Some(decode_body(body)?);
        }
        if let Some(headers) = self.data.headers {
            request.headers = headers;
        }

        request.validate()?;
        Ok(request)
    }
}

impl TryFrom<WireRequest> for Request {
    type Error = ProtocolError;

    fn try_from(wire: WireRequest) -> Result<Self, Self::Error> {
        wire.into_request()
    }
}

impl From<&Request> for WireRequest {
    fn from(request: &Request) -> Self {
        WireRequest {
            action: request.identity.action.clone(),
            url: request.identity.url.clone(),
            data: WireData {
                method: request.identity.method.as_str().to_string(),
                body: request.body.as_ref().map(|b| Value::String(b.to_string())),
                headers: (!request.headers.is_empty()).then(|| request.headers.clone()),
            },
        }
    }
}

/// String bodies hold encoded JSON; inline values are taken as-is.
fn decode_body(body: Value) -> ProtocolResult<Value> {
    match body {
        Value::String(text) => {
            serde_json::from_str(&text).map_err(|e| ProtocolError::InvalidBody(e.to_string()))
        }
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::RequestKind;
    use serde_json::json;

    #[test]
    fn admits_string_body() {
        let wire = WireRequest::from_json(
            r#"{"action":"GROUPS_SAVE","url":"/groups","data":{"method":"POST","body":"{\"ID\":\"tmp-42\",\"title\":\"Cell Group A\"}"}}"#,
        )
        .unwrap();
        let request = wire.into_request().unwrap();

        assert!(matches!(request.kind, RequestKind::Create { .. }));
        assert_eq!(request.body, Some(json!({"ID": "tmp-42", "title": "Cell Group A"})));
    }

    #[test]
    fn admits_inline_body_and_headers() {
        let wire: WireRequest = serde_json::from_value(json!({
            "action": "GROUPS_DELETE",
            "url": "/groups/7",
            "data": {"method": "delete", "body": {"force": true}, "headers": {"X-Token": "t"}}
        }))
        .unwrap();
        let request = Request::try_from(wire).unwrap();
        assert_eq!(request.method(), Method::Delete);
        assert_eq!(request.headers.get("X-Token").map(String::as_str), Some("t"));
    }

    #[test]
    fn rejects_bad_input() {
        let wire: WireRequest = serde_json::from_value(json!({
            "action": "GROUPS_SAVE", "url": "/groups", "data": {"method": "POST", "body": "{not json"}
        }))
        .unwrap();
        assert!(matches!(wire.into_request(), Err(ProtocolError::InvalidBody(_))));

        let wire: WireRequest = serde_json::from_value(json!({
            "url": "/groups", "data": {"method": "OPTIONS"}
        }))
        .unwrap();
        assert!(matches!(
            wire.into_request(),
            Err(ProtocolError::UnsupportedMethod(_))
        ));
    }

    #[test]
    fn request_back_to_wire() {
        let request = Request::from_action("GROUPS_SAVE", "/groups", Method::Post)
            .with_body(json!({"ID": "tmp-1"}));
        let wire = WireRequest::from(&request);
        assert_eq!(wire.data.method, "POST");
        assert_eq!(wire.data.body, Some(json!("{\"ID\":\"tmp-1\"}")));

        let again = wire.into_request().unwrap();
        assert!(again.is_duplicate_of(&request));
    }
}
