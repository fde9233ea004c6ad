//! TOML schema files.
//!
//! ```toml
//! [enums.Color]
//! values = [{ name = "RED", number = 0 }, { name = "GREEN", number = 1 }]
//!
//! [records.User]
//! path = "users"
//! fields = [
//!     { name = "id", type = "string", role = "id" },
//!     { name = "color", type = "Color" },
//! ]
//! ```

use super::descriptor::{
    CollectionMode, CollectionSettings, EnumDescriptor, EnumValue, FieldDescriptor, FieldKind,
    FieldRole, RecordDescriptor, ScalarKind, StorageSettings,
};
use crate::error::SchemaResolutionError;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SchemaFile {
    #[serde(default)]
    enums: BTreeMap<String, EnumSpec>,
    #[serde(default)]
    records: BTreeMap<String, RecordSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct EnumSpec {
    values: Vec<EnumValue>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RecordSpec {
    path: Option<String>,
    mode: Option<CollectionMode>,
    #[serde(default)]
    fields: Vec<FieldSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FieldSpec {
    name: String,
    #[serde(rename = "type")]
    type_name: String,
    #[serde(default)]
    repeated: bool,
    role: Option<FieldRole>,
    json_name: Option<String>,
    #[serde(default)]
    concrete: bool,
    #[serde(default)]
    ephemeral: bool,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    explicit: bool,
    collection: Option<CollectionSettings>,
}

/// Descriptors resolved from one schema file.
pub(crate) struct ResolvedSchema {
    pub enums: Vec<Arc<EnumDescriptor>>,
    pub records: Vec<Arc<RecordDescriptor>>,
}

pub(crate) fn resolve(toml_str: &str) -> Result<ResolvedSchema, SchemaResolutionError> {
    let file: SchemaFile = toml::from_str(toml_str)
        .map_err(|e| SchemaResolutionError::Parse(e.to_string()))?;

    let mut enums = HashMap::with_capacity(file.enums.len());
    for (name, spec) in &file.enums {
        enums.insert(name.clone(), EnumDescriptor::new(name.clone(), spec.values.clone())?);
    }

    let mut resolver = Resolver {
        specs: &file.records,
        enums: &enums,
        resolved: HashMap::with_capacity(file.records.len()),
        visiting: HashSet::new(),
    };
    let mut records = Vec::with_capacity(file.records.len());
    for name in file.records.keys() {
        records.push(resolver.resolve(name)?);
    }

    let mut enums: Vec<_> = enums.into_values().collect();
    enums.sort_by(|a, b| a.name().cmp(b.name()));
    Ok(ResolvedSchema { enums, records })
}

struct Resolver<'a> {
    specs: &'a BTreeMap<String, RecordSpec>,
    enums: &'a HashMap<String, Arc<EnumDescriptor>>,
    resolved: HashMap<String, Arc<RecordDescriptor>>,
    visiting: HashSet<String>,
}

impl Resolver<'_> {
    /// Resolves a record and, first, every record it depends on.
    fn resolve(&mut self, name: &str) -> Result<Arc<RecordDescriptor>, SchemaResolutionError> {
        if let Some(descriptor) = self.resolved.get(name) {
            return Ok(Arc::clone(descriptor));
        }
        let specs = self.specs;
        let spec = specs
            .get(name)
            .ok_or_else(|| SchemaResolutionError::RecordNotFound(name.to_string()))?;
        if !self.visiting.insert(name.to_string()) {
            return Err(SchemaResolutionError::CyclicType(name.to_string()));
        }

        let mut builder = RecordDescriptor::builder(name);
        if spec.path.is_some() || spec.mode.is_some() {
            builder = builder.storage(StorageSettings {
                mode: spec.mode,
                path: spec.path.clone(),
            });
        }
        for field in &spec.fields {
            let kind = self.kind_for(name, field)?;
            builder = builder.field(field_descriptor(field, kind));
        }
        let descriptor = builder.build()?;

        self.visiting.remove(name);
        self.resolved
            .insert(name.to_string(), Arc::clone(&descriptor));
        Ok(descriptor)
    }

    fn kind_for(
        &mut self,
        record: &str,
        field: &FieldSpec,
    ) -> Result<FieldKind, SchemaResolutionError> {
        let type_name = field.type_name.as_str();
        if let Some(kind) = ScalarKind::from_name(type_name) {
            return Ok(FieldKind::Scalar(kind));
        }
        if type_name == "timestamp" {
            return Ok(FieldKind::Timestamp);
        }
        if let Some(descriptor) = self.enums.get(type_name) {
            return Ok(FieldKind::Enum(Arc::clone(descriptor)));
        }
        if self.specs.contains_key(type_name) {
            return self.resolve(type_name).map(FieldKind::Message);
        }
        Err(SchemaResolutionError::UnknownType {
            record: record.to_string(),
            field: field.name.clone(),
            type_name: type_name.to_string(),
        })
    }
}

fn field_descriptor(spec: &FieldSpec, kind: FieldKind) -> FieldDescriptor {
    let mut descriptor = FieldDescriptor::new(spec.name.clone(), kind);
    if let Some(json_name) = &spec.json_name {
        descriptor.json_name = json_name.clone();
    }
    descriptor.repeated = spec.repeated;
    descriptor.options.role = spec.role;
    descriptor.options.concrete = spec.concrete;
    descriptor.options.ephemeral = spec.ephemeral;
    descriptor.options.required = spec.required;
    descriptor.options.explicit = spec.explicit;
    descriptor.options.collection = spec.collection.clone();
    descriptor
}
