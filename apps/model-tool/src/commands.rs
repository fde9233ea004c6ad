//! Command implementations. Each returns the text printed to stdout.

use anyhow::{anyhow, Context, Result};
use model_codec_core::config::CodecConfig;
use model_codec_core::diagnostics::TracingSink;
use model_codec_core::schema::SchemaRegistry;
use model_codec_core::value::{map_from_json, ValueMap};
use model_codec_core::write::{InMemoryWriteProxy, WriteOperation};
use model_codec_core::{ObjectModelCodec, ObjectModelDeserializer, Record, WriteDisposition};
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Loads the codec configuration, then applies `MODEL_CODEC_*` overrides.
pub fn load_config(path: Option<&Path>) -> Result<CodecConfig> {
    let mut config = match path {
        Some(path) => CodecConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => CodecConfig::default(),
    };
    config
        .apply_env_overrides()
        .context("Invalid environment override")?;
    Ok(config)
}

fn load_schema(path: &Path) -> Result<SchemaRegistry> {
    SchemaRegistry::from_file(path)
        .with_context(|| format!("Failed to load schema {}", path.display()))
}

fn read_map(path: &Path) -> Result<ValueMap> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let json = serde_json::from_str(&text)
        .with_context(|| format!("Invalid JSON in {}", path.display()))?;
    map_from_json(json).ok_or_else(|| anyhow!("{} does not hold a JSON object", path.display()))
}

fn read_record(registry: &SchemaRegistry, type_name: &str, path: &Path) -> Result<Record> {
    let descriptor = registry.require(type_name)?;
    let data = read_map(path)?;
    ObjectModelDeserializer::new(&descriptor)
        .inflate(&data)
        .with_context(|| format!("Failed to inflate {} from {}", type_name, path.display()))
}

pub fn validate(schema: &Path) -> Result<String> {
    let registry = load_schema(schema)?;
    let names = registry.record_names();
    tracing::info!(records = names.len(), "schema is valid");
    Ok(names.join("\n"))
}

pub fn deflate(
    config: CodecConfig,
    schema: &Path,
    type_name: &str,
    input: &Path,
    base: Option<&Path>,
) -> Result<String> {
    let registry = load_schema(schema)?;
    let record = read_record(&registry, type_name, input)?;
    let base = base
        .map(|path| read_record(&registry, type_name, path))
        .transpose()?;

    let codec = ObjectModelCodec::with_settings(record.descriptor(), config, Arc::new(TracingSink));
    let data = codec
        .serializer()
        .serialize(&record, base.as_ref(), Default::default())
        .context("Failed to serialize record")?;
    Ok(serde_json::to_string_pretty(&data)?)
}

/// Arguments of the `collapse` command.
pub struct CollapseArgs<'a> {
    pub schema: &'a Path,
    pub type_name: &'a str,
    pub input: &'a Path,
    pub parent: Option<(&'a str, &'a Path)>,
    pub disposition: WriteDisposition,
    pub apply: bool,
}

pub fn collapse(config: CodecConfig, args: CollapseArgs<'_>) -> Result<String> {
    let registry = load_schema(args.schema)?;
    let record = read_record(&registry, args.type_name, args.input)?;
    let parent = args
        .parent
        .map(|(type_name, path)| read_record(&registry, type_name, path))
        .transpose()?;

    let codec = ObjectModelCodec::with_settings(record.descriptor(), config, Arc::new(TracingSink));
    let collapsed = codec
        .collapse(&record, None, parent.as_ref(), args.disposition)
        .context("Failed to collapse record")?;

    if !args.apply {
        let writes: Vec<&WriteOperation> = collapsed.writes().collect();
        return Ok(serde_json::to_string_pretty(&writes)?);
    }
    let proxy = InMemoryWriteProxy::new();
    let written = collapsed
        .persist(None, &proxy)
        .context("Failed to apply write plan")?;
    tracing::info!(documents = written.len(), "write plan applied");
    Ok(serde_json::to_string_pretty(&proxy.documents())?)
}
