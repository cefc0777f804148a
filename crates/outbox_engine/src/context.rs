//! Collaborators handed to the coordinator.
//!
//! Connectivity, local state and the result consumer are owned by the
//! embedding application. They reach the coordinator through a `SyncContext`
//! value built once at construction.

use crate::queue::QueueStore;
use outbox_protocol::{Action, EntityType, Response};
use parking_lot::{Mutex, RwLock};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// Source of the current connectivity state.
pub trait Connectivity: Send + Sync {
    /// Returns true if the remote endpoint is believed reachable.
    fn is_connected(&self) -> bool;
}

/// A connectivity state toggled by the application.
#[derive(Debug)]
pub struct ConnectivityFlag {
    connected: AtomicBool,
}

impl ConnectivityFlag {
    /// Creates a flag with an initial state.
    pub fn new(connected: bool) -> Self {
        Self {
            connected: AtomicBool::new(connected),
        }
    }

    /// Updates the state.
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }
}

impl Default for ConnectivityFlag {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Connectivity for ConnectivityFlag {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

/// Read access to locally held entity data, used for offline reads.
pub trait LocalState: Send + Sync {
    /// Returns the local list for an entity type (empty if unknown).
    fn entity_list(&self, entity: &EntityType) -> Vec<Value>;

    /// Returns the local geoname list for an entity type (empty if unknown).
    fn geonames(&self, entity: &EntityType) -> Vec<Value>;
}

/// Serialized form of `MemoryLocalState`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocalSnapshot {
    /// Lists keyed by entity type.
    #[serde(default)]
    pub lists: HashMap<String, Vec<Value>>,
    /// Geoname lists keyed by entity type.
    #[serde(default)]
    pub geonames: HashMap<String, Vec<Value>>,
}

/// An in-memory local state provider.
#[derive(Debug, Default)]
pub struct MemoryLocalState {
    lists: RwLock<HashMap<EntityType, Vec<Value>>>,
    geonames: RwLock<HashMap<EntityType, Vec<Value>>>,
}

impl MemoryLocalState {
    /// Creates an empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a provider from a snapshot, normalizing entity-type keys.
    pub fn from_snapshot(snapshot: LocalSnapshot) -> Self {
        let state = Self::new();
        for (entity, list) in snapshot.lists {
            state.set_list(entity, list);
        }
        for (entity, list) in snapshot.geonames {
            state.set_geonames(entity, list);
        }
        state
    }

    /// Replaces the list for an entity type.
    pub fn set_list(&self, entity: impl Into<EntityType>, list: Vec<Value>) {
        self.lists.write().insert(entity.into(), list);
    }

    /// Replaces the geoname list for an entity type.
    pub fn set_geonames(&self, entity: impl Into<EntityType>, list: Vec<Value>) {
        self.geonames.write().insert(entity.into(), list);
    }
}

impl LocalState for MemoryLocalState {
    fn entity_list(&self, entity: &EntityType) -> Vec<Value> {
        self.lists.read().get(entity).cloned().unwrap_or_default()
    }

    fn geonames(&self, entity: &EntityType) -> Vec<Value> {
        self.geonames.read().get(entity).cloned().unwrap_or_default()
    }
}

/// Consumer of emitted actions (the application's reducers).
pub trait ActionSink: Send + Sync {
    /// Receives one action.
    fn emit(&self, action: Action);
}

/// A sink that records every action, for tests and the CLI.
#[derive(Debug, Default)]
pub struct RecordingSink {
    actions: Mutex<Vec<Action>>,
    notify: Notify,
}

impl RecordingSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all actions received so far.
    pub fn actions(&self) -> Vec<Action> {
        self.actions.lock().clone()
    }

    /// Returns the `(handler, response)` pairs of received result actions.
    pub fn results(&self) -> Vec<(String, Response)> {
        self.actions
            .lock()
            .iter()
            .filter_map(|action| match action {
                Action::Result { handler, payload } => {
                    Some((handler.clone(), payload.response.clone()))
                }
                Action::Removal(_) => None,
            })
            .collect()
    }

    /// Returns the number of actions received so far.
    pub fn len(&self) -> usize {
        self.actions.lock().len()
    }

    /// Returns true if nothing was received.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Waits until at least `count` actions were received.
    ///
    /// Returns false if `timeout` elapsed first.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> bool {
        let wait = async {
            loop {
                let notified = self.notify.notified();
                if self.len() >= count {
                    return;
                }
                notified.await;
            }
        };
        tokio::time::timeout(timeout, wait).await.is_ok()
    }
}

impl ActionSink for RecordingSink {
    fn emit(&self, action: Action) {
        self.actions.lock().push(action);
        self.notify.notify_waiters();
    }
}

/// Handles to every collaborator the coordinator needs.
#[derive(Clone)]
pub struct SyncContext {
    /// Pending requests.
    pub queue: Arc<dyn QueueStore>,
    /// Connectivity state.
    pub connectivity: Arc<dyn Connectivity>,
    /// Local data for offline reads.
    pub local_state: Arc<dyn LocalState>,
    /// Consumer of emitted actions.
    pub sink: Arc<dyn ActionSink>,
}

impl SyncContext {
    /// Bundles the collaborators.
    pub fn new(
        queue: Arc<dyn QueueStore>,
        connectivity: Arc<dyn Connectivity>,
        local_state: Arc<dyn LocalState>,
        sink: Arc<dyn ActionSink>,
    ) -> Self {
        Self {
            queue,
            connectivity,
            local_state,
            sink,
        }
    }

    /// Emits an action. Removals are applied to the queue before the sink
    /// sees them.
    pub fn emit(&self, action: Action) {
        if let Action::Removal(request) = &action {
            self.queue.remove(&request.id);
        }
        self.sink.emit(action);
    }
}

impl std::fmt::Debug for SyncContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncContext")
            .field("pending", &self.queue.len())
            .field("connected", &self.connectivity.is_connected())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::MemoryQueueStore;
    use outbox_protocol::{Method, Request, ResultPayload};
    use serde_json::json;

    #[test]
    fn connectivity_flag_toggles() {
        let flag = ConnectivityFlag::new(false);
        assert!(!flag.is_connected());
        flag.set_connected(true);
        assert!(flag.is_connected());
        assert!(ConnectivityFlag::default().is_connected());
    }

    #[test]
    fn local_state_lookups_are_normalized() {
        let state = MemoryLocalState::new();
        state.set_list("GROUPS", vec![json!({"ID": 1})]);

        assert_eq!(state.entity_list(&EntityType::new("groups")), vec![json!({"ID": 1})]);
        assert!(state.entity_list(&EntityType::new("contacts")).is_empty());
        assert!(state.geonames(&EntityType::new("groups")).is_empty());
    }

    #[test]
    fn local_state_from_snapshot() {
        let snapshot: LocalSnapshot = serde_json::from_value(json!({
            "lists": {"Contacts": [{"ID": 3}]},
            "geonames": {"groups": [{"grid_id": "100"}]}
        }))
        .unwrap();
        let state = MemoryLocalState::from_snapshot(snapshot);

        assert_eq!(state.entity_list(&"contacts".into()).len(), 1);
        assert_eq!(state.geonames(&"groups".into())[0]["grid_id"], "100");
    }

    #[test]
    fn emit_applies_removals_to_queue() {
        let queue = Arc::new(MemoryQueueStore::new());
        let sink = Arc::new(RecordingSink::new());
        let context = SyncContext::new(
            queue.clone(),
            Arc::new(ConnectivityFlag::default()),
            Arc::new(MemoryLocalState::new()),
            sink.clone(),
        );

        let request = Request::from_action("GROUPS_DELETE", "/groups/7", Method::Delete);
        queue.append(request.clone());

        context.emit(Action::result(
            "GROUPS_DELETE",
            ResultPayload::new(Response::ok(json!(true))),
        ));
        assert_eq!(queue.len(), 1);

        context.emit(Action::Removal(request));
        assert!(queue.is_empty());
        assert_eq!(sink.len(), 2);
        assert_eq!(sink.results().len(), 1);
    }

    #[tokio::test]
    async fn recording_sink_wait_for() {
        let sink = Arc::new(RecordingSink::new());
        assert!(!sink.wait_for(1, Duration::from_millis(10)).await);

        let emitter = Arc::clone(&sink);
        tokio::spawn(async move {
            emitter.emit(Action::result("PING", ResultPayload::new(Response::ok(json!({})))));
        });
        assert!(sink.wait_for(1, Duration::from_secs(5)).await);
    }
}
