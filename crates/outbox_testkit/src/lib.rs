//! # Outbox Testkit
//!
//! Test utilities for the Outbox sync coordinator.
//!
//! This crate provides:
//! - Request builders for every request kind
//! - A `TestHarness` wiring in-memory collaborators and a mock HTTP client
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use outbox_testkit::prelude::*;
//!
//! #[tokio::test]
//! async fn offline_delete() {
//!     let harness = TestHarness::offline();
//!     let (coordinator, _outbox) = harness.coordinator();
//!     let signal = harness.enqueue(requests::delete("groups", 7));
//!     coordinator.handle_intake(signal);
//!     // ... inspect harness.sink
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fixtures::*;
pub use generators::*;
