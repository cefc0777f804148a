//! Test fixtures and coordinator helpers.
//!
//! Provides request builders and a harness that wires the in-memory
//! collaborators to a scripted HTTP client.

use outbox_engine::{
    ConnectivityFlag, CoordinatorStats, MemoryLocalState, MemoryQueueStore, MockHttpClient,
    Outbox, QueueStore, RecordingSink, SyncConfig, SyncContext, SyncCoordinator,
};
use outbox_protocol::{IntakeSignal, Request};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// How long tests wait for emitted actions before failing.
pub const DEFAULT_WAIT: Duration = Duration::from_secs(5);

/// A coordinator test environment with automatic wiring.
pub struct TestHarness {
    /// Scripted remote endpoint.
    pub client: Arc<MockHttpClient>,
    /// Pending requests.
    pub queue: Arc<MemoryQueueStore>,
    /// Connectivity toggle.
    pub connectivity: Arc<ConnectivityFlag>,
    /// Local lists for offline reads.
    pub local_state: Arc<MemoryLocalState>,
    /// Every emitted action.
    pub sink: Arc<RecordingSink>,
    /// Coordinator configuration.
    pub config: SyncConfig,
}

impl TestHarness {
    /// Creates a harness with the given connectivity.
    pub fn new(connected: bool) -> Self {
        Self {
            client: Arc::new(MockHttpClient::new()),
            queue: Arc::new(MemoryQueueStore::new()),
            connectivity: Arc::new(ConnectivityFlag::new(connected)),
            local_state: Arc::new(MemoryLocalState::new()),
            sink: Arc::new(RecordingSink::new()),
            config: SyncConfig::default(),
        }
    }

    /// Creates a connected harness.
    pub fn online() -> Self {
        Self::new(true)
    }

    /// Creates a disconnected harness.
    pub fn offline() -> Self {
        Self::new(false)
    }

    /// Replaces the coordinator configuration.
    #[must_use]
    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the collaborator bundle.
    pub fn context(&self) -> SyncContext {
        SyncContext::new(
            self.queue.clone(),
            self.connectivity.clone(),
            self.local_state.clone(),
            self.sink.clone(),
        )
    }

    /// Creates a coordinator that the test drives cycle by cycle.
    pub fn coordinator(&self) -> (SyncCoordinator<Arc<MockHttpClient>>, Outbox) {
        SyncCoordinator::new(self.config.clone(), self.context(), Arc::clone(&self.client))
    }

    /// Starts a coordinator loop on the current runtime.
    pub fn spawn(&self) -> (Outbox, JoinHandle<CoordinatorStats>) {
        SyncCoordinator::spawn(self.config.clone(), self.context(), Arc::clone(&self.client))
    }

    /// Appends a request to the queue and returns its intake signal.
    pub fn enqueue(&self, request: Request) -> IntakeSignal {
        self.queue.append(request.clone());
        IntakeSignal::new(request)
    }

    /// Sets connectivity.
    pub fn set_connected(&self, connected: bool) {
        self.connectivity.set_connected(connected);
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::online()
    }
}

/// Builders for each request kind, using `<ENTITY>_<VERB>` action names.
pub mod requests {
    use outbox_protocol::{Method, Request};
    use serde_json::{json, Value};

    fn action(entity: &str, verb: &str) -> String {
        format!("{}_{}", entity.to_uppercase(), verb)
    }

    /// A create whose body carries `id` in its identity field.
    pub fn create(entity: &str, id: Value, title: &str) -> Request {
        Request::from_action(action(entity, "SAVE"), format!("/{}", entity), Method::Post)
            .with_body(json!({"ID": id, "title": title}))
    }

    /// A by-identity read.
    pub fn read_by_id(entity: &str, id: &str) -> Request {
        Request::from_action(
            action(entity, "GETBYID"),
            format!("/{}/{}", entity, id),
            Method::Get,
        )
    }

    /// A list read.
    pub fn read_all(entity: &str) -> Request {
        Request::from_action(action(entity, "GETALL"), format!("/{}", entity), Method::Get)
    }

    /// A location-grid read.
    pub fn read_locations(entity: &str) -> Request {
        Request::from_action(
            action(entity, "GET_LOCATIONS"),
            format!("/{}/locations", entity),
            Method::Get,
        )
    }

    /// An info update.
    pub fn update_info(entity: &str, body: Value) -> Request {
        Request::from_action(
            action(entity, "UPDATE_USER_INFO"),
            format!("/{}/me", entity),
            Method::Post,
        )
        .with_body(body)
    }

    /// A delete.
    pub fn delete(entity: &str, id: u64) -> Request {
        Request::from_action(
            action(entity, "DELETE"),
            format!("/{}/{}", entity, id),
            Method::Delete,
        )
    }
}
