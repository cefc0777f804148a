//! Actions emitted by the coordinator.

use crate::request::Request;
use crate::response::Response;
use serde::ser::{SerializeStruct, Serializer};
use serde::{Deserialize, Serialize};

/// Action type of a queue removal.
pub const REMOVAL_ACTION: &str = "RESPONSE";

/// Payload of a result action: the response plus the superseded provisional
/// id when a create was renumbered by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultPayload {
    /// The response.
    #[serde(flatten)]
    pub response: Response,
    /// Provisional id replaced by the server-assigned one.
    #[serde(rename = "oldID", default, skip_serializing_if = "Option::is_none")]
    pub old_id: Option<String>,
}

impl ResultPayload {
    /// Wraps a response without an old id.
    pub fn new(response: Response) -> Self {
        Self {
            response,
            old_id: None,
        }
    }

    /// Attaches the superseded provisional id.
    pub fn with_old_id(mut self, old_id: Option<String>) -> Self {
        self.old_id = old_id;
        self
    }
}

/// An action consumed by the state layer.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Result for the request's handler action.
    Result {
        /// Handler action name.
        handler: String,
        /// Response payload.
        payload: ResultPayload,
    },
    /// Removes a completed request from the queue.
    Removal(Request),
}

impl Action {
    /// Creates a result action.
    pub fn result(handler: impl Into<String>, payload: ResultPayload) -> Self {
        Action::Result {
            handler: handler.into(),
            payload,
        }
    }

    /// Returns the action type string.
    pub fn action_type(&self) -> &str {
        match self {
            Action::Result { handler, .. } => handler,
            Action::Removal(_) => REMOVAL_ACTION,
        }
    }

    /// Returns the result payload, if this is a result action.
    pub fn payload(&self) -> Option<&ResultPayload> {
        match self {
            Action::Result { payload, .. } => Some(payload),
            Action::Removal(_) => None,
        }
    }

    /// Returns the removed request, if this is a removal.
    pub fn removed(&self) -> Option<&Request> {
        match self {
            Action::Removal(request) => Some(request),
            Action::Result { .. } => None,
        }
    }
}

impl Serialize for Action {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Action", 2)?;
        state.serialize_field("type", self.action_type())?;
        match self {
            Action::Result { payload, .. } => state.serialize_field("payload", payload)?,
            Action::Removal(request) => state.serialize_field("payload", request)?,
        }
        state.end()
    }
}

/// An admitted request as carried on the intake channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntakeSignal {
    /// The admitted request.
    pub request: Request,
}

impl IntakeSignal {
    /// Wraps an admitted request.
    pub fn new(request: Request) -> Self {
        Self { request }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Method;
    use serde_json::json;

    #[test]
    fn result_action_shape() {
        let payload = ResultPayload::new(Response::ok(json!({"ID": 107})))
            .with_old_id(Some("tmp-42".into()));
        let action = Action::result("GROUPS_SAVE", payload);

        assert_eq!(
            serde_json::to_value(&action).unwrap(),
            json!({
                "type": "GROUPS_SAVE",
                "payload": {"status": 200, "data": {"ID": 107}, "oldID": "tmp-42"}
            })
        );
    }

    #[test]
    fn old_id_omitted_when_absent() {
        let action = Action::result("GROUPS_DELETE", ResultPayload::new(Response::ok(json!(true))));
        assert_eq!(
            serde_json::to_value(&action).unwrap(),
            json!({"type": "GROUPS_DELETE", "payload": {"status": 200, "data": true}})
        );
    }

    #[test]
    fn removal_action_carries_request() {
        let request = Request::from_action("GROUPS_GETALL", "/groups", Method::Get);
        let action = Action::Removal(request.clone());
        assert_eq!(action.action_type(), REMOVAL_ACTION);
        assert_eq!(action.removed(), Some(&request));
        assert!(action.payload().is_none());

        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["type"], "RESPONSE");
        assert_eq!(json["payload"]["url"], "/groups");
    }

    #[test]
    fn payload_round_trips_through_json() {
        let json = json!({"status": 200, "data": {"ID": 1}, "oldID": "tmp-1"});
        let payload: ResultPayload = serde_json::from_value(json).unwrap();
        assert_eq!(payload.old_id.as_deref(), Some("tmp-1"));
        assert!(payload.response.is_success());
    }
}
