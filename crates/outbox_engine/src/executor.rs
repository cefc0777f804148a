//! Request executor.
//!
//! Runs exactly one queued request against the remote endpoint and reports
//! the outcome exactly once:
//! 1. Strip the body `ID`, remembering it as `old_id` when provisional
//! 2. Call the network layer
//! 3. Emit the result for the request's handler, if it has one
//! 4. Emit the removal of the original request, whatever the outcome

use crate::config::SyncConfig;
use crate::context::SyncContext;
use crate::http::{into_response, CallOutcome, NetworkCallLayer};
use crate::transport::{HttpCall, HttpClient};
use outbox_protocol::{Action, EntityId, Request, RequestId, ResultPayload, IDENTITY_FIELD};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

/// Summary of one executor run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionReport {
    /// The executed request.
    pub request_id: RequestId,
    /// How the remote call ended.
    pub outcome: CallOutcome,
    /// Provisional id that was stripped from the body.
    pub old_id: Option<String>,
}

/// A call ready for transmission.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedCall {
    /// The outgoing call.
    pub call: HttpCall,
    /// Provisional id removed from the body.
    pub old_id: Option<String>,
}

/// Executes queued requests through the network call layer.
pub struct RequestExecutor<C: HttpClient> {
    layer: Arc<NetworkCallLayer<C>>,
    context: SyncContext,
    config: Arc<SyncConfig>,
}

impl<C: HttpClient> Clone for RequestExecutor<C> {
    fn clone(&self) -> Self {
        Self {
            layer: Arc::clone(&self.layer),
            context: self.context.clone(),
            config: Arc::clone(&self.config),
        }
    }
}

impl<C: HttpClient> RequestExecutor<C> {
    /// Creates an executor.
    pub fn new(layer: Arc<NetworkCallLayer<C>>, context: SyncContext, config: Arc<SyncConfig>) -> Self {
        Self {
            layer,
            context,
            config,
        }
    }

    /// Builds the outgoing call for a request.
    ///
    /// The body's identity field never leaves the client; the server assigns
    /// identities.
    pub fn prepare(&self, request: &Request) -> PreparedCall {
        let mut body = request.body.clone();
        let mut old_id = None;

        if let Some(Value::Object(map)) = body.as_mut() {
            if let Some(identity) = map.remove(IDENTITY_FIELD) {
                old_id = EntityId::from_value(&identity)
                    .filter(EntityId::is_provisional)
                    .map(|id| id.as_str().to_string());
            }
        }

        let mut headers = self.config.default_headers.clone();
        headers.extend(request.headers.clone());

        let call = HttpCall {
            method: request.method(),
            url: self.config.resolve_url(request.url()),
            headers,
            body: body.map(|b| b.to_string()),
        };
        PreparedCall { call, old_id }
    }

    /// Executes `request` and emits its result and removal.
    pub async fn execute(&self, request: Request) -> ExecutionReport {
        let PreparedCall { call, old_id } = self.prepare(&request);

        let result = self.layer.call(call).await;
        let outcome = CallOutcome::of(&result);
        if let Err(e) = &result {
            warn!(
                request_id = %request.id,
                action = request.action(),
                url = request.url(),
                error = %e,
                "request failed"
            );
        }
        let response = into_response(result);

        if let Some(handler) = request.handler() {
            let payload = ResultPayload::new(response).with_old_id(old_id.clone());
            self.context.emit(Action::result(handler, payload));
        }

        info!(
            request_id = %request.id,
            action = request.action(),
            outcome = ?outcome,
            renumbered = old_id.is_some(),
            "request executed"
        );

        let request_id = request.id;
        self.context.emit(Action::Removal(request));

        ExecutionReport {
            request_id,
            outcome,
            old_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ConnectivityFlag, MemoryLocalState, RecordingSink};
    use crate::queue::{MemoryQueueStore, QueueStore};
    use crate::transport::MockHttpClient;
    use outbox_protocol::{Method, Response};
    use serde_json::json;

    struct Fixture {
        client: Arc<MockHttpClient>,
        queue: Arc<MemoryQueueStore>,
        sink: Arc<RecordingSink>,
        executor: RequestExecutor<Arc<MockHttpClient>>,
    }

    fn fixture(config: SyncConfig) -> Fixture {
        let client = Arc::new(MockHttpClient::new());
        let queue = Arc::new(MemoryQueueStore::new());
        let sink = Arc::new(RecordingSink::new());
        let context = SyncContext::new(
            queue.clone(),
            Arc::new(ConnectivityFlag::default()),
            Arc::new(MemoryLocalState::new()),
            sink.clone(),
        );
        let layer = Arc::new(NetworkCallLayer::new(Arc::clone(&client), &config));
        let executor = RequestExecutor::new(layer, context, Arc::new(config));
        Fixture {
            client,
            queue,
            sink,
            executor,
        }
    }

    fn create(id: Value) -> Request {
        Request::from_action("GROUPS_SAVE", "/groups", Method::Post)
            .with_body(json!({"ID": id, "title": "Cell Group A"}))
    }

    #[test]
    fn prepare_strips_provisional_identity() {
        let f = fixture(SyncConfig::new().with_base_url("https://api.example.com"));
        let prepared = f.executor.prepare(&create(json!("tmp-42")));

        assert_eq!(prepared.old_id.as_deref(), Some("tmp-42"));
        assert_eq!(prepared.call.url, "https://api.example.com/groups");
        assert_eq!(prepared.call.json_body(), Some(json!({"title": "Cell Group A"})));
    }

    #[test]
    fn prepare_strips_server_identity_without_old_id() {
        let f = fixture(SyncConfig::new());
        let prepared = f.executor.prepare(&create(json!(107)));
        assert!(prepared.old_id.is_none());
        assert_eq!(prepared.call.json_body(), Some(json!({"title": "Cell Group A"})));

        let prepared = f.executor.prepare(&create(json!("107")));
        assert!(prepared.old_id.is_none());
    }

    #[test]
    fn prepare_merges_headers() {
        let f = fixture(
            SyncConfig::new()
                .with_default_header("Authorization", "Bearer default")
                .with_default_header("Accept", "application/json"),
        );
        let request = Request::from_action("GROUPS_GETALL", "/groups", Method::Get)
            .with_header("Authorization", "Bearer user");
        let prepared = f.executor.prepare(&request);

        assert_eq!(prepared.call.headers["Authorization"], "Bearer user");
        assert_eq!(prepared.call.headers["Accept"], "application/json");
        assert!(prepared.call.body.is_none());
    }

    #[tokio::test]
    async fn success_emits_result_then_removal() {
        let f = fixture(SyncConfig::new());
        f.client.push_response(201, r#"{"ID":107,"title":"Cell Group A"}"#);
        let request = create(json!("tmp-42"));
        f.queue.append(request.clone());

        let report = f.executor.execute(request.clone()).await;
        assert_eq!(report.outcome, CallOutcome::Success);
        assert_eq!(report.old_id.as_deref(), Some("tmp-42"));

        let actions = f.sink.actions();
        assert_eq!(actions.len(), 2);
        assert_eq!(
            serde_json::to_value(&actions[0]).unwrap(),
            json!({
                "type": "GROUPS_SAVE",
                "payload": {"status": 200, "data": {"ID": 107, "title": "Cell Group A"}, "oldID": "tmp-42"}
            })
        );
        assert_eq!(actions[1].removed(), Some(&request));
        assert!(f.queue.is_empty());
    }

    #[tokio::test]
    async fn failure_still_removes() {
        let f = fixture(SyncConfig::new());
        f.client.push_failure("connection reset");
        let request = Request::from_action("GROUPS_DELETE", "/groups/7", Method::Delete);
        f.queue.append(request.clone());

        let report = f.executor.execute(request).await;
        assert_eq!(report.outcome, CallOutcome::GenericFailure);
        assert_eq!(f.sink.results()[0].1, Response::generic_failure());
        assert!(f.queue.is_empty());
    }

    #[tokio::test]
    async fn no_handler_only_removes() {
        let f = fixture(SyncConfig::new());
        let request = Request::from_action("", "/ping", Method::Get);
        f.queue.append(request.clone());

        f.executor.execute(request).await;
        let actions = f.sink.actions();
        assert_eq!(actions.len(), 1);
        assert!(actions[0].removed().is_some());
        assert!(f.queue.is_empty());
    }
}
