//! # Outbox Sync Engine
//!
//! Offline-first request coordination for Outbox.
//!
//! This crate provides:
//! - The sync coordinator loop (idle → branching → dispatched/synthesized)
//! - Request execution with provisional-identity reconciliation
//! - Offline local synthesis of server-shaped responses
//! - Three-way classification of remote call outcomes
//! - HTTP client abstraction with a scriptable mock
//! - In-memory queue, local-state and sink collaborators
//!
//! ## Architecture
//!
//! Requests flow through a single intake channel:
//! 1. `Outbox::admit` appends the request to the queue and signals the loop
//! 2. The coordinator reads connectivity once per signal
//! 3. A read of a never-synced entity is answered from local state and
//!    dropped from the queue
//! 4. Offline, the latest queued entry is answered from local state
//! 5. Online, the newest matching queue entry is handed to a forked
//!    executor, which emits the result and then the removal of the entry;
//!    older idle duplicates are superseded
//!
//! ## Key Invariants
//!
//! - A queue entry is removed only after its lifecycle completes
//! - Provisional identities are never sent upstream
//! - Every failure is normalized into a response; nothing escapes a cycle
//! - One failing request never stops the loop

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod config;
mod context;
mod coordinator;
mod error;
mod executor;
mod http;
mod queue;
mod synthesis;
mod transport;

pub use config::SyncConfig;
pub use context::{
    ActionSink, Connectivity, ConnectivityFlag, LocalSnapshot, LocalState, MemoryLocalState,
    RecordingSink, SyncContext,
};
pub use coordinator::{CoordinatorState, CoordinatorStats, CycleOutcome, Outbox, SyncCoordinator};
pub use error::{SyncError, SyncResult};
pub use executor::{ExecutionReport, PreparedCall, RequestExecutor};
pub use http::{classify, into_response, CallOutcome, NetworkCallLayer};
pub use queue::{MemoryQueueStore, QueueStore};
pub use synthesis::LocalSynthesizer;
pub use transport::{HttpCall, HttpClient, MockHttpClient, MockReply, RawResponse};
