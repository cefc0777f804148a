//! Offline local synthesis.
//!
//! Answers a request from local state in the same `{status, data}` shape the
//! server would use, so result consumers cannot tell the two apart.

use crate::context::LocalState;
use outbox_protocol::{Request, RequestKind, Response, IDENTITY_FIELD};
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// Builds responses without network access.
#[derive(Clone)]
pub struct LocalSynthesizer {
    local_state: Arc<dyn LocalState>,
}

impl LocalSynthesizer {
    /// Creates a synthesizer over a local state provider.
    pub fn new(local_state: Arc<dyn LocalState>) -> Self {
        Self { local_state }
    }

    /// Synthesizes a response for `request`.
    ///
    /// Returns `None` for kinds that can only run online.
    pub fn synthesize(&self, request: &Request) -> Option<Response> {
        let data = match &request.kind {
            RequestKind::Create { .. } => request.body.clone().unwrap_or(Value::Null),
            RequestKind::ReadById { id, .. } => {
                let mut data = Map::new();
                data.insert(IDENTITY_FIELD.to_string(), Value::String(id.clone()));
                data.insert("isOffline".to_string(), Value::Bool(true));
                Value::Object(data)
            }
            RequestKind::ReadAll { entity } => json!({
                "posts": self.local_state.entity_list(entity),
            }),
            RequestKind::ReadLocations { entity } => json!({
                "location_grid": self.local_state.geonames(entity),
            }),
            RequestKind::UpdateInfo { .. } => json!({}),
            RequestKind::Delete { .. } => Value::Bool(true),
            RequestKind::Other { .. } => return None,
        };
        Some(Response::ok(data))
    }
}
