//! Property-based test generators using proptest.
//!
//! Strategies produce values that each attribute kind accepts, so the
//! generated data always satisfies the codec's valid-value predicate.

use kvattr_codec::{AttrKind, Value};
use proptest::prelude::*;

/// Strategy for the scalar attribute kinds.
pub fn scalar_kind_strategy() -> impl Strategy<Value = AttrKind> {
    prop::sample::select(
        AttrKind::ALL
            .iter()
            .copied()
            .filter(|kind| kind.is_scalar())
            .collect::<Vec<_>>(),
    )
}

/// Strategy for JSON arrays and objects, up to two levels deep.
pub fn json_container_strategy() -> impl Strategy<Value = serde_json::Value> {
    let leaf = prop_oneof![
        Just(serde_json::Value::Null),
        any::<bool>().prop_map(serde_json::Value::from),
        any::<i64>().prop_map(serde_json::Value::from),
        "[a-zA-Z0-9 _-]{0,12}".prop_map(serde_json::Value::from),
    ];
    let inner = prop_oneof![
        leaf.clone(),
        prop::collection::vec(leaf.clone(), 0..4).prop_map(serde_json::Value::from),
    ];
    prop_oneof![
        prop::collection::vec(inner.clone(), 0..5).prop_map(serde_json::Value::Array),
        prop::collection::btree_map("[a-z]{1,6}", inner, 0..5)
            .prop_map(|map| serde_json::Value::Object(map.into_iter().collect())),
    ]
}

/// Strategy for non-null values valid for `kind`.
///
/// # Panics
///
/// Panics for [`AttrKind::SortedSet`], which has no scalar values.
pub fn value_strategy(kind: AttrKind) -> BoxedStrategy<Value> {
    match kind {
        AttrKind::String => ".{0,24}".prop_map(Value::Text).boxed(),
        AttrKind::Integer => any::<i64>().prop_map(Value::Integer).boxed(),
        AttrKind::Boolean => any::<bool>().prop_map(Value::Bool).boxed(),
        AttrKind::Json => json_container_strategy().prop_map(Value::Json).boxed(),
        AttrKind::SortedSet => panic!("sorted sets have no scalar values"),
    }
}

/// Strategy for a scalar kind paired with a value it accepts.
pub fn kind_and_value_strategy() -> impl Strategy<Value = (AttrKind, Value)> {
    scalar_kind_strategy().prop_flat_map(|kind| (Just(kind), value_strategy(kind)))
}

/// Strategy for attribute names.
pub fn attribute_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9_]{0,15}").expect("Invalid regex")
}

/// Strategy for owner identities as they appear in keys.
pub fn identity_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        any::<u32>().prop_map(|n| n.to_string()),
        prop::string::string_regex("[a-z0-9-]{1,20}").expect("Invalid regex"),
    ]
}

/// Strategy for CamelCase type names, optionally namespaced.
pub fn type_name_strategy() -> impl Strategy<Value = String> {
    let word = || prop::string::string_regex("[A-Z][a-z]{1,7}").expect("Invalid regex");
    (
        proptest::option::of(word()),
        prop::collection::vec(word(), 1..3),
    )
        .prop_map(|(namespace, words)| {
            let name = words.concat();
            match namespace {
                Some(ns) => format!("{ns}::{name}"),
                None => name,
            }
        })
}

/// Strategy for distinct sorted-set members, in a random order.
pub fn members_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::btree_set("[a-z]{1,8}", 0..12)
        .prop_map(|set| set.into_iter().collect::<Vec<_>>())
        .prop_shuffle()
}
