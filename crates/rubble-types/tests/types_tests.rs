//! Integration tests for rubble-types.

use rubble_types::constants::{
    DEFAULT_BOND_ITERATIONS_PER_FRAME, DEFAULT_GRAPH_REDUCTION_LEVEL, STATIC_NODES_COUNT_PENALTY,
};
use rubble_types::{ActorId, RubbleError, INVALID_INDEX};

// ─── ID Tests ──────────────────────────────────────────────────

#[test]
fn actor_id_from_raw() {
    let a: ActorId = 9.into();
    assert_eq!(a, ActorId(9));
    assert_eq!(a.to_string(), "actor#9");
}

#[test]
fn actor_ids_order_by_value() {
    let mut ids = vec![ActorId(5), ActorId(1), ActorId(3)];
    ids.sort();
    assert_eq!(ids, vec![ActorId(1), ActorId(3), ActorId(5)]);
}

#[test]
fn actor_id_is_serializable() {
    let id = ActorId(100);
    let json = serde_json::to_string(&id).unwrap();
    let deserialized: ActorId = serde_json::from_str(&json).unwrap();
    assert_eq!(id, deserialized);
}

#[test]
fn invalid_index_is_max() {
    assert_eq!(INVALID_INDEX, u32::MAX);
}

// ─── Constant Tests ───────────────────────────────────────────

#[test]
fn defaults() {
    assert_eq!(DEFAULT_BOND_ITERATIONS_PER_FRAME, 18_000);
    assert_eq!(DEFAULT_GRAPH_REDUCTION_LEVEL, 3);
    assert_eq!(STATIC_NODES_COUNT_PENALTY, 8);
}

// ─── Error Tests ──────────────────────────────────────────────

#[test]
fn error_display() {
    let err = RubbleError::InvalidGraph("adjacency partition not monotonic".into());
    assert!(err.to_string().contains("not monotonic"));
}

#[test]
fn index_out_of_range_display() {
    let err = RubbleError::IndexOutOfRange {
        kind: "node",
        index: 12,
        count: 4,
    };
    let msg = err.to_string();
    assert!(msg.contains("12"));
    assert!(msg.contains("node"));
    assert!(msg.contains("4"));
}

#[test]
fn config_error_display() {
    let err = RubbleError::InvalidConfig("hardness must be positive".into());
    assert_eq!(err.to_string(), "Invalid configuration: hardness must be positive");
}
