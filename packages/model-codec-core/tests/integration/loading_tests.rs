//! Schema and configuration files loaded from disk.

use ntest::timeout;
use std::fs;
use tempfile::tempdir;

use model_codec_core::config::{CodecConfig, EnumMode, InstantMode};
use model_codec_core::diagnostics::MemorySink;
use model_codec_core::error::{ConfigError, SchemaResolutionError};
use model_codec_core::schema::SchemaRegistry;
use model_codec_core::value::Value;
use model_codec_core::ObjectModelCodec;
use std::sync::Arc;

use crate::helpers::{account, SHOP_SCHEMA};

#[timeout(1000)]
#[test]
fn test_schema_and_config_files_drive_the_codec() {
    let dir = tempdir().unwrap();
    let schema_path = dir.path().join("shop.toml");
    let config_path = dir.path().join("codec.toml");
    fs::write(&schema_path, SHOP_SCHEMA).unwrap();
    fs::write(
        &config_path,
        "enum_mode = \"numeric\"\ninstant_mode = \"iso8601\"\ninclude_nulls = true\n",
    )
    .unwrap();

    let registry = SchemaRegistry::from_file(&schema_path).unwrap();
    assert_eq!(
        registry.record_names(),
        vec!["Account", "Address", "LineItem", "Order"]
    );

    let config = CodecConfig::from_file(&config_path).unwrap();
    assert_eq!(config.enum_mode, EnumMode::Numeric);
    assert_eq!(config.instant_mode, InstantMode::Iso8601);
    assert!(config.include_nulls);
    assert!(config.empty_lists_as_nulls);

    let sink = Arc::new(MemorySink::new());
    let codec = ObjectModelCodec::with_settings(
        &registry.require("Account").unwrap(),
        config,
        sink.clone(),
    );
    let record = account(&registry);
    let data = codec.deflate(&record).unwrap();
    assert_eq!(data["tier"], Value::Integer(1));
    assert_eq!(
        data["created_at"],
        Value::String("2023-11-14T22:13:20.000000500Z".into())
    );
    assert_eq!(codec.inflate(&data).unwrap(), record);
    assert!(sink.is_empty());
}

#[timeout(1000)]
#[test]
fn test_missing_files_are_io_errors() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("absent.toml");

    assert!(matches!(
        SchemaRegistry::from_file(&missing),
        Err(SchemaResolutionError::Io(_))
    ));
    assert!(matches!(
        CodecConfig::from_file(&missing),
        Err(ConfigError::Io(_))
    ));
}

#[timeout(1000)]
#[test]
fn test_malformed_files_are_parse_errors() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.toml");
    fs::write(&path, "[records.User\nfields = [").unwrap();

    assert!(matches!(
        SchemaRegistry::from_file(&path),
        Err(SchemaResolutionError::Parse(_))
    ));
    assert!(matches!(
        CodecConfig::from_file(&path),
        Err(ConfigError::Parse(_))
    ));

    fs::write(&path, "enum_mode = \"ordinal\"\n").unwrap();
    assert!(matches!(
        CodecConfig::from_file(&path),
        Err(ConfigError::Parse(_))
    ));
}

#[timeout(1000)]
#[test]
fn test_schema_annotations_are_validated_on_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("invalid.toml");
    fs::write(
        &path,
        r#"
        [records.Ticket]
        fields = [
            { name = "id", type = "int64", role = "id" },
        ]
        "#,
    )
    .unwrap();

    assert!(matches!(
        SchemaRegistry::from_file(&path),
        Err(SchemaResolutionError::InvalidAnnotation { .. })
    ));
}
