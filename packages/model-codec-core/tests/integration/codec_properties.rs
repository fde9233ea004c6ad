//! Codec properties: round-trip, idempotence, default elision, required
//! fields, references, concrete flattening, enum modes and bytes.

use ntest::timeout;
use std::sync::Arc;

use model_codec_core::config::{CodecConfig, EnumMode, InstantMode};
use model_codec_core::diagnostics::MemorySink;
use model_codec_core::error::{CodecError, DeserializationError, SerializationError};
use model_codec_core::record::{NativeValue, Record, Timestamp};
use model_codec_core::schema::{FieldDescriptor, FieldRole, RecordDescriptor, ScalarKind};
use model_codec_core::serializer::CONCRETE_TYPE_PROPERTY;
use model_codec_core::value::{map_from_json, Value};
use model_codec_core::{ObjectModelCodec, ObjectModelSerializer};

use crate::helpers::{account, line_item, order, registry};

fn codec_with(name: &str, config: CodecConfig) -> ObjectModelCodec {
    let registry = registry();
    ObjectModelCodec::with_settings(
        &registry.require(name).unwrap(),
        config,
        Arc::new(MemorySink::new()),
    )
}

#[timeout(1000)]
#[test]
fn test_round_trip_preserves_every_set_field() {
    let registry = registry();
    let codec = ObjectModelCodec::for_model(&registry.require("Account").unwrap());
    let record = account(&registry);

    let data = codec.deflate(&record).unwrap();
    assert_eq!(codec.inflate(&data).unwrap(), record);
}

#[timeout(1000)]
#[test]
fn test_round_trip_with_defaults_included() {
    let config = CodecConfig {
        include_defaults: true,
        empty_lists_as_nulls: false,
        ..CodecConfig::default()
    };
    let codec = codec_with("Account", config);
    let record = Record::builder(codec.descriptor())
        .set("id", "a2")
        .set("email", "grace@example.com")
        .build()
        .unwrap();

    let data = codec.deflate(&record).unwrap();
    assert_eq!(data["tier"], Value::String("FREE".into()));
    assert_eq!(data["badges"], Value::List(Vec::new()));
    assert_eq!(codec.inflate(&data).unwrap(), record);
}

#[timeout(1000)]
#[test]
fn test_round_trip_through_json() {
    let registry = registry();
    let codec = ObjectModelCodec::for_model(&registry.require("Account").unwrap());
    let record = account(&registry);

    let json = Value::Map(codec.deflate(&record).unwrap()).to_json();
    let text = serde_json::to_string(&json).unwrap();
    let parsed = map_from_json(serde_json::from_str(&text).unwrap()).unwrap();

    assert_eq!(codec.inflate(&parsed).unwrap(), record);
}

#[timeout(1000)]
#[test]
fn test_serialization_is_idempotent() {
    let registry = registry();
    let codec = ObjectModelCodec::for_model(&registry.require("Account").unwrap());

    let first = codec.deflate(&account(&registry)).unwrap();
    let second = codec.deflate(&codec.inflate(&first).unwrap()).unwrap();
    assert_eq!(first, second);
}

#[timeout(1000)]
#[test]
fn test_defaults_and_ephemeral_fields_are_elided() {
    let registry = registry();
    let codec = ObjectModelCodec::for_model(&registry.require("Account").unwrap());
    let record = Record::builder(codec.descriptor())
        .set("id", "a3")
        .set("email", "x@example.com")
        .set("credits", 0u64)
        .set("password", "hunter2")
        .build()
        .unwrap();

    let data = codec.deflate(&record).unwrap();
    let keys: Vec<&str> = data.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["email", "id"]);
}

#[timeout(1000)]
#[test]
fn test_missing_required_fails_both_directions() {
    let registry = registry();
    let codec = ObjectModelCodec::for_model(&registry.require("Account").unwrap());
    let record = Record::builder(codec.descriptor())
        .set("id", "a4")
        .build()
        .unwrap();

    assert_eq!(
        codec.deflate(&record).unwrap_err(),
        CodecError::Serialization(SerializationError::MissingRequired {
            record: "Account".into(),
            field: "email".into(),
        })
    );

    let mut data = codec.deflate(&account(&registry)).unwrap();
    data.remove("email");
    assert_eq!(
        codec.inflate(&data).unwrap_err(),
        CodecError::Deserialization(DeserializationError::MissingRequired {
            record: "Account".into(),
            field: "email".into(),
        })
    );
}

#[timeout(1000)]
#[test]
fn test_references_serialize_as_paths_and_inflate_to_keys() {
    let registry = registry();
    let codec = ObjectModelCodec::for_model(&registry.require("Order").unwrap());
    let record = order(&registry);

    let data = codec.deflate(&record).unwrap();
    assert_eq!(data["buyer"], Value::Reference("accounts/a1".into()));

    let restored = codec.inflate(&data).unwrap();
    let buyer = restored.record("buyer").unwrap();
    assert_eq!(buyer.type_name(), "Account");
    assert_eq!(buyer.string("id"), Some("a1"));
    assert_eq!(restored, record);
}

#[timeout(1000)]
#[test]
fn test_nested_collections_are_inlined_by_deflate() {
    let registry = registry();
    let codec = ObjectModelCodec::for_model(&registry.require("Order").unwrap());

    let data = codec.deflate(&order(&registry)).unwrap();
    let items = data["items"].as_list().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].as_map().unwrap()["sku"], Value::String("SKU-1".into()));
    assert_eq!(
        data["shipping"].as_map().unwrap()["city"],
        Value::String("Lisbon".into())
    );
}

#[timeout(1000)]
#[test]
fn test_required_fields_of_nested_records_are_checked() {
    let registry = registry();
    let codec = ObjectModelCodec::for_model(&registry.require("Order").unwrap());
    let unnamed = Record::builder(&registry.require("LineItem").unwrap())
        .set("id", "l9")
        .build()
        .unwrap();
    let record = order(&registry)
        .to_builder()
        .push("items", unnamed)
        .build()
        .unwrap();

    assert!(matches!(
        codec.deflate(&record).unwrap_err(),
        CodecError::Serialization(SerializationError::MissingRequired { ref field, .. })
            if field == "sku"
    ));
}

#[timeout(1000)]
#[test]
fn test_base_diff_writes_only_changes() {
    let registry = registry();
    let serializer = ObjectModelSerializer::default();
    let base = account(&registry);
    let updated = base
        .to_builder()
        .set("tier", NativeValue::Enum(2))
        .clear("rating")
        .build()
        .unwrap();

    let data = serializer
        .serialize(&updated, Some(&base), Default::default())
        .unwrap();
    assert_eq!(data.len(), 2);
    assert_eq!(data["tier"], Value::String("ENTERPRISE".into()));
    assert_eq!(data["rating"], Value::Double(0.0));
}

#[timeout(1000)]
#[test]
fn test_enum_modes() {
    let registry = registry();
    let record = account(&registry);

    let by_name = codec_with("Account", CodecConfig::default());
    let data = by_name.deflate(&record).unwrap();
    assert_eq!(data["tier"], Value::String("PRO".into()));
    assert_eq!(
        data["badges"],
        Value::List(vec![Value::String("EARLY".into()), Value::String("STAFF".into())])
    );

    let numeric = codec_with(
        "Account",
        CodecConfig {
            enum_mode: EnumMode::Numeric,
            ..CodecConfig::default()
        },
    );
    let data = numeric.deflate(&record).unwrap();
    assert_eq!(data["tier"], Value::Integer(1));
    assert_eq!(
        data["badges"],
        Value::List(vec![Value::Integer(1), Value::Integer(2)])
    );
    assert_eq!(numeric.inflate(&data).unwrap(), record);
}

#[timeout(1000)]
#[test]
fn test_bytes_and_unsigned_values() {
    let registry = registry();
    let codec = ObjectModelCodec::for_model(&registry.require("Account").unwrap());
    let data = codec.deflate(&account(&registry)).unwrap();

    assert_eq!(data["avatar"], Value::String("3q2+7w==".into()));
    assert_eq!(data["credits"], Value::Integer(-1));

    let mut corrupted = data.clone();
    corrupted.insert("avatar".into(), Value::String("not base64!".into()));
    assert!(matches!(
        codec.inflate(&corrupted).unwrap_err(),
        CodecError::Deserialization(DeserializationError::InvalidBytes { .. })
    ));
}

#[timeout(1000)]
#[test]
fn test_iso_instants() {
    let registry = registry();
    let codec = codec_with(
        "Account",
        CodecConfig {
            instant_mode: InstantMode::Iso8601,
            ..CodecConfig::default()
        },
    );
    let record = account(&registry)
        .to_builder()
        .set("created_at", Timestamp::new(1_700_000_000, 0))
        .build()
        .unwrap();

    let data = codec.deflate(&record).unwrap();
    assert_eq!(data["created_at"], Value::String("2023-11-14T22:13:20Z".into()));
    assert_eq!(codec.inflate(&data).unwrap(), record);
}

#[timeout(1000)]
#[test]
fn test_concrete_variants_flatten_and_restore() {
    let card = RecordDescriptor::builder("Card")
        .field(FieldDescriptor::scalar("last4", ScalarKind::String))
        .build()
        .unwrap();
    let wire = RecordDescriptor::builder("Wire")
        .field(FieldDescriptor::scalar("iban", ScalarKind::String))
        .build()
        .unwrap();
    let payment = RecordDescriptor::builder("Payment")
        .field(FieldDescriptor::scalar("id", ScalarKind::String).role(FieldRole::Id))
        .field(FieldDescriptor::message("card", &card).concrete())
        .field(FieldDescriptor::message("wire", &wire).concrete())
        .build()
        .unwrap();
    let codec = ObjectModelCodec::for_model(&payment);
    let record = Record::builder(&payment)
        .set("id", "pay1")
        .set(
            "wire",
            Record::builder(&wire).set("iban", "PT50000").build().unwrap(),
        )
        .build()
        .unwrap();

    let data = codec.deflate(&record).unwrap();
    assert_eq!(data[CONCRETE_TYPE_PROPERTY], Value::String("wire".into()));
    assert_eq!(data["iban"], Value::String("PT50000".into()));
    assert!(!data.contains_key("wire"));

    let restored = codec.inflate(&data).unwrap();
    assert!(!restored.has("card"));
    assert_eq!(restored, record);
}

#[timeout(1000)]
#[test]
fn test_line_items_accept_numeric_strings() {
    let registry = registry();
    let codec = ObjectModelCodec::for_model(&registry.require("LineItem").unwrap());
    let data = map_from_json(serde_json::json!({
        "id": "l1",
        "sku": "SKU-1",
        "quantity": "2",
    }))
    .unwrap();
    assert_eq!(
        codec.inflate(&data).unwrap(),
        line_item(&registry, "l1", "SKU-1", 2)
    );
}
