//! # Outbox Protocol
//!
//! Data model shared by the Outbox sync coordinator and its callers.
//!
//! This crate provides:
//! - `Request` and its admission-time `RequestKind`
//! - `EntityId` classification (server id vs. provisional id)
//! - `Response` with the `{status, data}` contract
//! - Emitted `Action`s (result handlers and queue removals)
//! - The legacy JSON intake format (`WireRequest`)
//!
//! This is a pure data crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod action;
mod entity_id;
mod error;
mod kind;
mod request;
mod response;
mod wire;

pub use action::{Action, IntakeSignal, ResultPayload, REMOVAL_ACTION};
pub use entity_id::{is_server_id, EntityId};
pub use error::{ProtocolError, ProtocolResult};
pub use kind::{EntityType, RequestKind};
pub use request::{Method, Request, RequestId, RequestIdentity, IDENTITY_FIELD};
pub use response::{
    ApiError, Response, Status, GENERIC_FAILURE_CODE, GENERIC_FAILURE_MESSAGE,
    GENERIC_FAILURE_STATUS,
};
pub use wire::{WireData, WireRequest};
