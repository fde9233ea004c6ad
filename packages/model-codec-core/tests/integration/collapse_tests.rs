//! Collapsing record trees into write plans and persisting them.

use ntest::timeout;

use model_codec_core::error::{CodecError, SerializationError, WriteError};
use model_codec_core::record::Record;
use model_codec_core::schema::CollectionMode;
use model_codec_core::value::Value;
use model_codec_core::write::{InMemoryWriteProxy, Operation, WriteDisposition};
use model_codec_core::ObjectModelCodec;

use crate::helpers::{account, line_item, order, registry};

#[timeout(1000)]
#[test]
fn test_collapse_orders_root_before_children() {
    let registry = registry();
    let codec = ObjectModelCodec::for_model(&registry.require("Order").unwrap());

    let collapsed = codec
        .collapse(&order(&registry), None, None, WriteDisposition::Blind)
        .unwrap();
    let paths: Vec<&str> = collapsed.operations().iter().map(Operation::path).collect();
    assert_eq!(paths, vec!["orders/o1", "orders/o1/lines/l1", "orders/o1/lines/l2"]);

    let root = collapsed.root().unwrap();
    assert_eq!(root.mode, CollectionMode::Group);
    assert!(!root.data.contains_key("items"));
    assert_eq!(root.data["buyer"], Value::Reference("accounts/a1".into()));
    assert!(root.data["shipping"].as_map().is_some());

    for child in collapsed.writes().skip(1) {
        assert_eq!(child.parent, Some(0));
        assert_eq!(child.mode, CollectionMode::Collection);
        assert_eq!(child.field.as_deref(), Some("items"));
    }
    let first = &collapsed.operations()[1];
    assert_eq!(
        collapsed.parent_of(first).map(Operation::path),
        Some("orders/o1")
    );
}

#[timeout(1000)]
#[test]
fn test_collapse_relaxes_required_fields_in_collections() {
    let registry = registry();
    let codec = ObjectModelCodec::for_model(&registry.require("Order").unwrap());
    let unnamed = Record::builder(&registry.require("LineItem").unwrap())
        .set("id", "l3")
        .build()
        .unwrap();
    let record = order(&registry)
        .to_builder()
        .push("items", unnamed)
        .build()
        .unwrap();

    let collapsed = codec
        .collapse(&record, None, None, WriteDisposition::Blind)
        .unwrap();
    assert_eq!(collapsed.writes().count(), 4);
}

#[timeout(1000)]
#[test]
fn test_collapse_under_parent_prefixes_paths() {
    let registry = registry();
    let codec = ObjectModelCodec::for_model(&registry.require("Order").unwrap());
    let owner = account(&registry);

    let collapsed = codec
        .collapse(&order(&registry), None, Some(&owner), WriteDisposition::Create)
        .unwrap();
    assert!(matches!(&collapsed.operations()[0], Operation::Parent(_)));
    let paths: Vec<&str> = collapsed.writes().map(|write| write.path.as_str()).collect();
    assert_eq!(
        paths,
        vec![
            "accounts/a1/orders/o1",
            "accounts/a1/orders/o1/lines/l1",
            "accounts/a1/orders/o1/lines/l2",
        ]
    );
}

#[timeout(1000)]
#[test]
fn test_collapse_without_id_fails_before_any_write() {
    let registry = registry();
    let codec = ObjectModelCodec::for_model(&registry.require("Order").unwrap());
    let record = order(&registry).to_builder().clear("id").build().unwrap();

    assert_eq!(
        codec
            .collapse(&record, None, None, WriteDisposition::Blind)
            .unwrap_err(),
        CodecError::Serialization(SerializationError::MissingId {
            record: "Order".into()
        })
    );
}

#[timeout(1000)]
#[test]
fn test_collapse_with_base_skips_unchanged_children() {
    let registry = registry();
    let codec = ObjectModelCodec::for_model(&registry.require("Order").unwrap());
    let base = order(&registry);
    let updated = base
        .to_builder()
        .set("note", "ring twice")
        .build()
        .unwrap();

    let collapsed = codec
        .collapse(&updated, Some(&base), None, WriteDisposition::Update)
        .unwrap();
    assert_eq!(collapsed.len(), 1);
    let root = collapsed.root().unwrap();
    assert_eq!(root.data.len(), 1);
    assert_eq!(root.data["note"], Value::String("ring twice".into()));
}

#[timeout(1000)]
#[test]
fn test_persist_writes_every_document() {
    let registry = registry();
    let codec = ObjectModelCodec::for_model(&registry.require("Order").unwrap());
    let proxy = InMemoryWriteProxy::new();

    let collapsed = codec
        .collapse(&order(&registry), None, None, WriteDisposition::Create)
        .unwrap();
    let written = collapsed.persist(Some("tenants/t1"), &proxy).unwrap();
    assert_eq!(
        written,
        vec![
            "tenants/t1/orders/o1".to_string(),
            "tenants/t1/orders/o1/lines/l1".to_string(),
            "tenants/t1/orders/o1/lines/l2".to_string(),
        ]
    );
    let line = proxy.get("tenants/t1/orders/o1/lines/l2").unwrap();
    assert_eq!(line["sku"], Value::String("SKU-2".into()));

    assert_eq!(
        collapsed.persist(Some("tenants/t1"), &proxy).unwrap_err(),
        WriteError::Conflict {
            path: "tenants/t1/orders/o1".into()
        }
    );
}

#[timeout(1000)]
#[test]
fn test_persist_update_merges_diff() {
    let registry = registry();
    let codec = ObjectModelCodec::for_model(&registry.require("Order").unwrap());
    let proxy = InMemoryWriteProxy::new();
    let base = order(&registry);

    codec
        .collapse(&base, None, None, WriteDisposition::Blind)
        .unwrap()
        .persist(None, &proxy)
        .unwrap();

    let updated = base
        .to_builder()
        .clear("items")
        .push("items", line_item(&registry, "l1", "SKU-1", 5))
        .build()
        .unwrap();
    let diff = codec
        .collapse(&updated, Some(&base), None, WriteDisposition::Update)
        .unwrap();
    diff.persist(None, &proxy).unwrap();

    let line = proxy.get("orders/o1/lines/l1").unwrap();
    assert_eq!(line["quantity"], Value::Integer(5));
    let root = proxy.get("orders/o1").unwrap();
    assert_eq!(root["note"], Value::String("leave at door".into()));
    assert_eq!(proxy.len(), 3);
}
