//! Queue store abstraction.
//!
//! The queue is owned by the caller's state layer. The coordinator only reads
//! snapshots; removals arrive as `Action::Removal` and are applied through
//! `SyncContext::emit`.

use outbox_protocol::{Request, RequestId};
use parking_lot::RwLock;

/// Ordered store of pending requests.
///
/// Implementations serialize their own mutations.
pub trait QueueStore: Send + Sync {
    /// Appends a newly admitted request.
    fn append(&self, request: Request);

    /// Returns all pending requests in admission order.
    fn snapshot(&self) -> Vec<Request>;

    /// Returns the most recently queued pending request.
    fn latest(&self) -> Option<Request>;

    /// Removes a request by id. Returns false if it was not queued.
    fn remove(&self, id: &RequestId) -> bool;

    /// Returns the number of pending requests.
    fn len(&self) -> usize;

    /// Returns true if nothing is pending.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An in-memory queue store.
#[derive(Debug, Default)]
pub struct MemoryQueueStore {
    entries: RwLock<Vec<Request>>,
}

impl MemoryQueueStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-filled with pending requests.
    pub fn with_entries(entries: Vec<Request>) -> Self {
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Returns true if a request with this id is pending.
    pub fn contains(&self, id: &RequestId) -> bool {
        self.entries.read().iter().any(|r| r.id == *id)
    }
}

impl QueueStore for MemoryQueueStore {
    fn append(&self, request: Request) {
        self.entries.write().push(request);
    }

    fn snapshot(&self) -> Vec<Request> {
        self.entries.read().clone()
    }

    fn latest(&self) -> Option<Request> {
        self.entries.read().last().cloned()
    }

    fn remove(&self, id: &RequestId) -> bool {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|r| r.id != *id);
        entries.len() != before
    }

    fn len(&self) -> usize {
        self.entries.read().len()
    }
}
