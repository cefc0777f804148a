//! Request kinds.
//!
//! Every request is tagged with a `RequestKind` when it is admitted. The kind
//! decides offline synthesis and dedup matching; nothing downstream inspects
//! action names again.

use crate::entity_id::EntityId;
use crate::request::Method;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Normalized entity-type identifier, e.g. `groups` or `contacts`.
///
/// Used as the key for local-state lookups.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct EntityType(String);

impl EntityType {
    /// Creates a normalized (trimmed, lower-case) entity type.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(name.as_ref().trim().to_lowercase())
    }

    /// Returns the normalized name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for EntityType {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl From<&str> for EntityType {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<EntityType> for String {
    fn from(entity: EntityType) -> Self {
        entity.0
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a request does, decided once at admission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RequestKind {
    /// Creates a new entity (write).
    Create {
        /// Target entity type.
        entity: EntityType,
    },
    /// Fetches one entity by identity.
    ReadById {
        /// Target entity type.
        entity: EntityType,
        /// Identity taken from the last url path segment.
        id: String,
    },
    /// Fetches the full list of an entity type.
    ReadAll {
        /// Target entity type.
        entity: EntityType,
    },
    /// Fetches the location grid for an entity type.
    ReadLocations {
        /// Target entity type.
        entity: EntityType,
    },
    /// Fire-and-forget info update.
    UpdateInfo {
        /// Target entity type.
        entity: EntityType,
    },
    /// Deletes an entity.
    Delete {
        /// Target entity type.
        entity: EntityType,
    },
    /// Executes online only; has no offline synthesis.
    Other {
        /// Target entity type.
        entity: EntityType,
    },
}

impl RequestKind {
    /// Creates a by-identity read, taking the identity from `url`.
    pub fn read_by_id(entity: impl Into<EntityType>, url: &str) -> Self {
        RequestKind::ReadById {
            entity: entity.into(),
            id: id_from_url(url).to_string(),
        }
    }

    /// Derives the kind from a `<ENTITY>_<VERB>` action name.
    ///
    /// The action is split once at the first underscore and the verb token is
    /// compared as a whole, together with the method. Unknown combinations map
    /// to `Other`.
    pub fn from_action(action: &str, method: Method, url: &str) -> Self {
        let (entity, verb) = match action.split_once('_') {
            Some((entity, verb)) => (EntityType::new(entity), verb),
            None => (EntityType::new(action), ""),
        };

        match (method, verb) {
            (Method::Post, "SAVE") => RequestKind::Create { entity },
            (Method::Get, "GETBYID") => RequestKind::ReadById {
                entity,
                id: id_from_url(url).to_string(),
            },
            (Method::Get, "GETALL") => RequestKind::ReadAll { entity },
            (Method::Get, "GET_LOCATIONS") => RequestKind::ReadLocations { entity },
            (Method::Post, "UPDATE_USER_INFO") => RequestKind::UpdateInfo { entity },
            (Method::Delete, "DELETE") => RequestKind::Delete { entity },
            _ => RequestKind::Other { entity },
        }
    }

    /// Returns the entity type this request targets.
    pub fn entity(&self) -> &EntityType {
        match self {
            RequestKind::Create { entity }
            | RequestKind::ReadById { entity, .. }
            | RequestKind::ReadAll { entity }
            | RequestKind::ReadLocations { entity }
            | RequestKind::UpdateInfo { entity }
            | RequestKind::Delete { entity }
            | RequestKind::Other { entity } => entity,
        }
    }

    /// Returns true for entity-creating writes.
    pub fn is_create(&self) -> bool {
        matches!(self, RequestKind::Create { .. })
    }

    /// Returns the classified target identity of a by-identity read.
    pub fn target_id(&self) -> Option<EntityId> {
        match self {
            RequestKind::ReadById { id, .. } => EntityId::parse(id),
            _ => None,
        }
    }

    /// Short label used in logs and summaries.
    pub fn label(&self) -> &'static str {
        match self {
            RequestKind::Create { .. } => "create",
            RequestKind::ReadById { .. } => "read_by_id",
            RequestKind::ReadAll { .. } => "read_all",
            RequestKind::ReadLocations { .. } => "read_locations",
            RequestKind::UpdateInfo { .. } => "update_info",
            RequestKind::Delete { .. } => "delete",
            RequestKind::Other { .. } => "other",
        }
    }
}

/// Last path segment of a url, ignoring any query string.
fn id_from_url(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/').next().unwrap_or(path)
}
