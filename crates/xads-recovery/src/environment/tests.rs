//! Tests for TransactionEnvironment

use super::*;

#[test]
fn test_default_environment() {
    let environment = TransactionEnvironment::default();
    assert!(environment.core().node_identifier().is_none());
    assert!(environment.coordinator().commit_one_phase());
    assert_eq!(environment.coordinator().default_timeout(), 60);
    assert_eq!(environment.jdbc().isolation_level(), 8);
    for kind in StoreKind::ALL {
        assert_eq!(
            environment.object_store(kind).object_store_dir(),
            Path::new(DEFAULT_OBJECT_STORE_DIR)
        );
    }
}

#[test]
fn test_node_identifier_limit_is_enforced() {
    let mut core = CoreEnvironment::default();

    core.set_node_identifier(Some("a".repeat(MAX_NODE_IDENTIFIER_BYTES)))
        .expect("28 bytes fits");
    assert_eq!(core.node_identifier().map(str::len), Some(28));

    let err = core
        .set_node_identifier(Some("a".repeat(MAX_NODE_IDENTIFIER_BYTES + 1)))
        .unwrap_err();
    assert!(matches!(err, XadsError::InvalidConfiguration(_)));
    // rejected value leaves the previous identifier in place
    assert_eq!(core.node_identifier().map(str::len), Some(28));

    core.set_node_identifier(None).expect("clear");
    assert!(core.node_identifier().is_none());
}

#[test]
fn test_object_stores_are_independent() {
    let mut environment = TransactionEnvironment::default();
    environment
        .object_store_mut(StoreKind::State)
        .set_object_store_dir("/tmp/state");

    assert_eq!(
        environment.object_store(StoreKind::State).object_store_dir(),
        Path::new("/tmp/state")
    );
    assert_eq!(
        environment.object_store(StoreKind::Default).object_store_dir(),
        Path::new(DEFAULT_OBJECT_STORE_DIR)
    );
}

#[test]
fn test_environment_serializes_to_json() {
    let mut environment = TransactionEnvironment::default();
    environment
        .core_mut()
        .set_node_identifier(Some("node-1".into()))
        .expect("set");
    let json = serde_json::to_value(&environment).expect("serialize");
    assert_eq!(json["core"]["node_identifier"], "node-1");
    assert_eq!(json["coordinator"]["default_timeout"], 60);
}
