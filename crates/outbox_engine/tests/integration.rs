//! Integration tests for the coordinator against an in-memory REST server.

use outbox_engine::{
    ConnectivityFlag, HttpCall, HttpClient, MemoryLocalState, MemoryQueueStore, QueueStore,
    RawResponse, RecordingSink, SyncConfig, SyncContext, SyncCoordinator,
};
use outbox_protocol::{Action, Method, Request, Response};
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// A tiny REST server for one collection, reachable through `HttpClient`.
#[derive(Default)]
struct InMemoryServer {
    records: Mutex<BTreeMap<u64, Value>>,
    next_id: Mutex<u64>,
    received: Mutex<Vec<HttpCall>>,
}

impl InMemoryServer {
    fn new(first_id: u64) -> Self {
        Self {
            next_id: Mutex::new(first_id),
            ..Default::default()
        }
    }

    fn handle(&self, call: &HttpCall) -> RawResponse {
        let path = call.url.trim_start_matches("memory://api");
        let segment = path.rsplit('/').next().unwrap_or_default();

        match call.method {
            Method::Post if path == "/groups" => {
                let mut record = match call.json_body() {
                    Some(Value::Object(map)) => map,
                    _ => Map::new(),
                };
                if record.contains_key("ID") {
                    return RawResponse::new(
                        400,
                        r#"{"code":"rest_invalid_param","message":"ID is read-only","data":{"status":400}}"#,
                    );
                }
                let mut next = self.next_id.lock();
                let id = *next;
                *next += 1;
                record.insert("ID".into(), json!(id));
                let record = Value::Object(record);
                self.records.lock().insert(id, record.clone());
                RawResponse::new(201, record.to_string())
            }
            Method::Get if path == "/groups" => {
                let posts: Vec<Value> = self.records.lock().values().cloned().collect();
                RawResponse::new(200, json!({ "posts": posts }).to_string())
            }
            Method::Delete => match segment.parse::<u64>() {
                Ok(id) if self.records.lock().remove(&id).is_some() => {
                    RawResponse::new(200, "true")
                }
                _ => RawResponse::new(
                    404,
                    r#"{"code":"rest_post_invalid_id","message":"Invalid post ID.","data":{"status":404}}"#,
                ),
            },
            _ => RawResponse::new(500, "<html><body>Internal Server Error</body></html>"),
        }
    }
}

impl HttpClient for InMemoryServer {
    fn send(&self, call: HttpCall) -> impl Future<Output = Result<RawResponse, String>> + Send {
        let response = self.handle(&call);
        self.received.lock().push(call);
        async move { Ok(response) }
    }
}

struct Harness {
    server: Arc<InMemoryServer>,
    queue: Arc<MemoryQueueStore>,
    connectivity: Arc<ConnectivityFlag>,
    sink: Arc<RecordingSink>,
    context: SyncContext,
}

fn harness(connected: bool) -> Harness {
    let server = Arc::new(InMemoryServer::new(107));
    let queue = Arc::new(MemoryQueueStore::new());
    let connectivity = Arc::new(ConnectivityFlag::new(connected));
    let local = MemoryLocalState::new();
    local.set_list("groups", vec![json!({"ID": "tmp-42", "title": "Cell Group A"})]);
    let sink = Arc::new(RecordingSink::new());
    let context = SyncContext::new(
        queue.clone(),
        connectivity.clone(),
        Arc::new(local),
        sink.clone(),
    );
    Harness {
        server,
        queue,
        connectivity,
        sink,
        context,
    }
}

fn config() -> SyncConfig {
    SyncConfig::new()
        .with_base_url("memory://api")
        .with_default_header("Content-Type", "application/json")
}

#[tokio::test]
async fn offline_then_online_flush() {
    let h = harness(false);
    let (outbox, handle) =
        SyncCoordinator::spawn(config(), h.context.clone(), Arc::clone(&h.server));

    outbox
        .admit(
            Request::from_action("GROUPS_SAVE", "/groups", Method::Post)
                .with_body(json!({"ID": "tmp-42", "title": "Cell Group A"})),
        )
        .unwrap();
    assert!(h.sink.wait_for(1, Duration::from_secs(5)).await);

    // Offline: the write is confirmed optimistically and stays queued.
    assert_eq!(
        h.sink.results()[0].1,
        Response::ok(json!({"ID": "tmp-42", "title": "Cell Group A"}))
    );
    assert_eq!(h.queue.len(), 1);

    h.connectivity.set_connected(true);
    assert_eq!(outbox.replay_pending().unwrap(), 1);
    drop(outbox);

    let stats = handle.await.unwrap();
    assert_eq!(stats.synthesized, 1);
    assert_eq!(stats.dispatched, 1);
    assert!(h.queue.is_empty());

    let actions = h.sink.actions();
    assert_eq!(actions.len(), 3);
    assert_eq!(
        serde_json::to_value(&actions[1]).unwrap(),
        json!({
            "type": "GROUPS_SAVE",
            "payload": {"status": 200, "data": {"ID": 107, "title": "Cell Group A"}, "oldID": "tmp-42"}
        })
    );
    assert!(matches!(actions[2], Action::Removal(_)));

    let sent = h.server.received.lock().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].url, "memory://api/groups");
    assert_eq!(sent[0].headers["Content-Type"], "application/json");
    assert_eq!(sent[0].json_body(), Some(json!({"title": "Cell Group A"})));
}

#[tokio::test]
async fn online_round_trip() {
    let h = harness(true);
    let (outbox, handle) =
        SyncCoordinator::spawn(config(), h.context.clone(), Arc::clone(&h.server));

    outbox
        .admit(
            Request::from_action("GROUPS_SAVE", "/groups", Method::Post)
                .with_body(json!({"title": "Prayer Group"})),
        )
        .unwrap();
    assert!(h.sink.wait_for(2, Duration::from_secs(5)).await);

    outbox
        .admit(Request::from_action("GROUPS_GETALL", "/groups", Method::Get))
        .unwrap();
    assert!(h.sink.wait_for(4, Duration::from_secs(5)).await);
    drop(outbox);
    handle.await.unwrap();

    let results = h.sink.results();
    assert!(h.sink.actions()[0].payload().unwrap().old_id.is_none());
    assert_eq!(
        results[1].1.data,
        json!({"posts": [{"ID": 107, "title": "Prayer Group"}]})
    );
}

#[tokio::test]
async fn server_errors_are_classified() {
    let h = harness(true);
    let (outbox, handle) =
        SyncCoordinator::spawn(config(), h.context.clone(), Arc::clone(&h.server));

    outbox
        .admit(Request::from_action("GROUPS_DELETE", "/groups/999", Method::Delete))
        .unwrap();
    outbox
        .admit(Request::from_action("GROUPS_EXPORT", "/groups/export", Method::Put))
        .unwrap();
    drop(outbox);

    let stats = handle.await.unwrap();
    assert_eq!(stats.failed, 2);
    assert!(h.queue.is_empty());

    let results = h.sink.results();
    let by_handler: BTreeMap<_, _> = results.into_iter().collect();
    let missing = &by_handler["GROUPS_DELETE"];
    assert_eq!(missing.status.as_u16(), Some(404));
    assert_eq!(missing.error().unwrap().code, "rest_post_invalid_id");
    assert!(by_handler["GROUPS_EXPORT"].is_generic_failure());
}

#[tokio::test]
async fn provisional_read_never_reaches_server() {
    let h = harness(true);
    let (outbox, handle) =
        SyncCoordinator::spawn(config(), h.context.clone(), Arc::clone(&h.server));

    outbox
        .admit(Request::from_action("GROUPS_GETBYID", "/groups/tmp-42", Method::Get))
        .unwrap();
    drop(outbox);
    handle.await.unwrap();

    assert!(h.server.received.lock().is_empty());
    assert_eq!(
        h.sink.results()[0].1.data,
        json!({"ID": "tmp-42", "isOffline": true})
    );
    assert!(h.queue.is_empty());
}

#[tokio::test]
async fn removal_leaves_no_residual_state() {
    let h = harness(true);
    let (outbox, handle) =
        SyncCoordinator::spawn(config(), h.context.clone(), Arc::clone(&h.server));

    let first = outbox
        .admit(Request::from_action("GROUPS_GETALL", "/groups", Method::Get))
        .unwrap();
    assert!(h.sink.wait_for(2, Duration::from_secs(5)).await);
    let second = outbox
        .admit(Request::from_action("GROUPS_GETALL", "/groups", Method::Get))
        .unwrap();
    drop(outbox);

    let stats = handle.await.unwrap();
    assert_ne!(first, second);
    assert_eq!(stats.dispatched, 2);
    assert_eq!(h.server.received.lock().len(), 2);
    assert!(h.queue.snapshot().is_empty());
}
