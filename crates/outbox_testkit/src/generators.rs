//! Property-based test generators using proptest.
//!
//! Provides strategies for identities, entity types and requests that keep
//! the classification invariants (server ids are numeric, provisional ids
//! never are).

use crate::fixtures::requests;
use outbox_protocol::Request;
use proptest::prelude::*;
use serde_json::{json, Value};

/// Strategy for entity type names as they appear in action names.
pub fn entity_name_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("groups".to_string()),
        Just("contacts".to_string()),
        Just("users".to_string()),
        "[a-z]{3,12}",
    ]
}

/// Strategy for client-assigned identities.
pub fn provisional_id_strategy() -> impl Strategy<Value = String> {
    "(tmp|local|draft)-[a-z0-9]{1,12}"
}

/// Strategy for server-assigned identities, as numbers or numeric strings.
pub fn server_id_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        (1u64..10_000_000).prop_map(|id| json!(id)),
        (1u64..10_000_000).prop_map(|id| json!(id.to_string())),
    ]
}

/// Strategy for locally held entity lists.
pub fn entity_list_strategy() -> impl Strategy<Value = Vec<Value>> {
    prop::collection::vec(
        (1u64..100_000, "[A-Za-z ]{1,24}").prop_map(|(id, title)| json!({"ID": id, "title": title})),
        0..8,
    )
}

/// Strategy for create requests carrying a provisional identity.
///
/// Yields the request together with that identity.
pub fn provisional_create_strategy() -> impl Strategy<Value = (Request, String)> {
    (entity_name_strategy(), provisional_id_strategy(), "[A-Za-z ]{1,24}").prop_map(
        |(entity, id, title)| (requests::create(&entity, json!(id.clone()), &title), id),
    )
}

/// Strategy for create requests carrying a server identity.
pub fn server_create_strategy() -> impl Strategy<Value = Request> {
    (entity_name_strategy(), server_id_strategy(), "[A-Za-z ]{1,24}")
        .prop_map(|(entity, id, title)| requests::create(&entity, id, &title))
}

/// Strategy for requests that have a local synthesis.
pub fn synthesizable_request_strategy() -> impl Strategy<Value = Request> {
    prop_oneof![
        provisional_create_strategy().prop_map(|(request, _)| request),
        (entity_name_strategy(), provisional_id_strategy())
            .prop_map(|(entity, id)| requests::read_by_id(&entity, &id)),
        entity_name_strategy().prop_map(|entity| requests::read_all(&entity)),
        entity_name_strategy().prop_map(|entity| requests::read_locations(&entity)),
        entity_name_strategy().prop_map(|entity| requests::update_info(&entity, json!({}))),
        (entity_name_strategy(), 1u64..100_000)
            .prop_map(|(entity, id)| requests::delete(&entity, id)),
    ]
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use outbox_protocol::{is_server_id, EntityId};

    proptest! {
        #![proptest_config(PropTestConfig::quick().to_proptest_config())]

        #[test]
        fn provisional_ids_are_never_numeric(id in provisional_id_strategy()) {
            prop_assert!(!is_server_id(&id));
            prop_assert!(EntityId::parse(&id).unwrap().is_provisional());
        }

        #[test]
        fn server_ids_classify_as_server(id in server_id_strategy()) {
            let classified = EntityId::from_value(&id);
            prop_assert!(matches!(classified, Some(EntityId::Server(_))));
        }

        #[test]
        fn generated_creates_are_creates(request in server_create_strategy()) {
            prop_assert!(request.kind.is_create());
            prop_assert!(request.body_identity().is_some());
        }
    }
}
