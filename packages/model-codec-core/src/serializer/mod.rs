//! Record serialization: the per-record field walk (deflate) and record-tree
//! collapsing into write operations.
//!
//! Maps are keyed by field name. Concrete sub-records are flattened into their
//! host and tagged with [`CONCRETE_TYPE_PROPERTY`].

mod collapse;
mod identity;

pub use identity::{collection_path, record_path, reference_value};

use crate::config::CodecConfig;
use crate::diagnostics::{default_sink, CodecWarning, SharedSink};
use crate::error::{Result, SerializationError};
use crate::record::{FieldData, NativeValue, Record};
use crate::schema::{CollectionMode, FieldDescriptor, FieldKind, RecordDescriptor};
use crate::value::coerce::{Coercion, CoercionError};
use crate::value::{Value, ValueMap};
use std::collections::BTreeSet;
use std::fmt;

/// Discriminator written next to flattened concrete fields.
pub const CONCRETE_TYPE_PROPERTY: &str = "concreteType";

/// Context flags for [`ObjectModelSerializer::serialize`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SerializeScope<'a> {
    /// Omit sub-records that are written as their own operations
    pub skip_collections: bool,
    /// Record is an element of a collection write; relaxes REQUIRED checks
    pub in_collection: bool,
    /// Discriminator to stamp on the output
    pub concrete: Option<&'a str>,
}

/// Outcome of extracting one field.
enum Slot {
    Value(Value),
    /// No value; written as null only under `include_nulls` or EXPLICIT
    Absent,
    /// Handled elsewhere or dropped
    Skip,
}

/// Serializes records into sorted generic maps.
pub struct ObjectModelSerializer {
    config: CodecConfig,
    coercion: Coercion,
    diagnostics: SharedSink,
}

impl ObjectModelSerializer {
    pub fn new(config: CodecConfig) -> Self {
        Self::with_diagnostics(config, default_sink())
    }

    pub fn with_diagnostics(config: CodecConfig, diagnostics: SharedSink) -> Self {
        Self {
            coercion: Coercion::new(config.enum_mode, config.instant_mode),
            config,
            diagnostics,
        }
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Serializes a record with no base and the default scope.
    pub fn deflate(&self, record: &Record) -> Result<ValueMap> {
        self.serialize(record, None, SerializeScope::default())
    }

    /// Builds the sorted map for one record.
    ///
    /// # Arguments
    /// * `record` - Record to serialize
    /// * `base` - Previous state of the same record; fields identical to it count as defaults
    /// * `scope` - Collection and discriminator context
    pub fn serialize(
        &self,
        record: &Record,
        base: Option<&Record>,
        scope: SerializeScope<'_>,
    ) -> Result<ValueMap> {
        check_base(record, base)?;
        let descriptor = record.descriptor();
        let mut data = ValueMap::new();
        let mut concrete = Vec::new();

        for (index, field) in descriptor.fields().iter().enumerate() {
            let options = &field.options;
            if options.ephemeral {
                continue;
            }
            let current = record.get_at(index);
            if current.is_none()
                && options.required
                && !scope.in_collection
                && field.kind.as_enum().is_none()
            {
                return Err(SerializationError::MissingRequired {
                    record: descriptor.name().to_string(),
                    field: field.name.clone(),
                }
                .into());
            }
            if scope.skip_collections && is_deferred(field) {
                continue;
            }

            let is_default = match (current, base.and_then(|base| base.get_at(index))) {
                (Some(value), Some(previous)) => value == previous,
                (Some(_), None) => false,
                (None, previous) => previous.is_none(),
            };
            // Required enums always carry a value, even at their default.
            let forced = options.required && (current.is_some() || field.kind.as_enum().is_some());
            let include =
                !is_default || self.config.include_defaults || options.explicit || forced;

            let slot = if include {
                self.extract(record, field, current, &mut concrete)?
            } else {
                Slot::Absent
            };
            match slot {
                Slot::Value(value) => {
                    data.insert(field.name.clone(), value);
                }
                Slot::Absent
                    if !options.concrete && (self.config.include_nulls || options.explicit) =>
                {
                    data.insert(field.name.clone(), Value::Null);
                }
                Slot::Absent | Slot::Skip => {}
            }
        }

        for (field, sub_map) in concrete {
            merge_concrete(descriptor, field, sub_map, &mut data)?;
        }
        if let Some(discriminator) = scope.concrete {
            data.insert(
                CONCRETE_TYPE_PROPERTY.to_string(),
                Value::String(discriminator.to_string()),
            );
        }
        Ok(data)
    }

    fn extract<'r>(
        &self,
        record: &Record,
        field: &'r FieldDescriptor,
        current: Option<&FieldData>,
        concrete: &mut Vec<(&'r FieldDescriptor, ValueMap)>,
    ) -> Result<Slot> {
        let Some(current) = current else {
            return Ok(self.default_slot(record, field));
        };
        match (&field.kind, current) {
            (FieldKind::Message(_), FieldData::Single(NativeValue::Record(sub))) => {
                self.extract_record(record, field, sub, concrete)
            }
            (FieldKind::Message(_), FieldData::Repeated(items)) => {
                let mut maps = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        NativeValue::Record(sub) => maps.push(Value::Map(self.deflate(sub)?)),
                        other => self.skipped(record, field, other),
                    }
                }
                Ok(Slot::Value(Value::List(maps)))
            }
            (_, FieldData::Single(value)) => Ok(self.wrap(record, field, value)),
            (_, FieldData::Repeated(values)) => {
                let wrapped = values
                    .iter()
                    .filter_map(|value| match self.wrap(record, field, value) {
                        Slot::Value(value) => Some(value),
                        Slot::Absent | Slot::Skip => None,
                    })
                    .collect();
                Ok(Slot::Value(Value::List(wrapped)))
            }
        }
    }

    fn extract_record<'r>(
        &self,
        record: &Record,
        field: &'r FieldDescriptor,
        sub: &Record,
        concrete: &mut Vec<(&'r FieldDescriptor, ValueMap)>,
    ) -> Result<Slot> {
        if field.is_reference() {
            let path = record_path(sub).map_err(|err| SerializationError::UnresolvedReference {
                record: record.type_name().to_string(),
                field: field.name.clone(),
                reason: err.to_string(),
            })?;
            return Ok(Slot::Value(Value::Reference(path)));
        }
        let sub_map = self.deflate(sub)?;
        if field.options.concrete {
            concrete.push((field, sub_map));
            return Ok(Slot::Skip);
        }
        Ok(Slot::Value(Value::Map(sub_map)))
    }

    /// Value written for an unset field that is still included.
    fn default_slot(&self, record: &Record, field: &FieldDescriptor) -> Slot {
        if field.repeated {
            return if self.config.empty_lists_as_nulls {
                Slot::Absent
            } else {
                Slot::Value(Value::List(Vec::new()))
            };
        }
        match NativeValue::default_for(&field.kind) {
            Some(default) => self.wrap(record, field, &default),
            None => Slot::Absent,
        }
    }

    fn wrap(&self, record: &Record, field: &FieldDescriptor, value: &NativeValue) -> Slot {
        match self.coercion.wrap(value, &field.kind) {
            Ok(wrapped) => Slot::Value(wrapped),
            Err(CoercionError::InvalidTimestamp(reason)) => {
                self.diagnostics.warn(CodecWarning::InstantConversion {
                    record: record.type_name().to_string(),
                    field: field.name.clone(),
                    reason,
                });
                Slot::Absent
            }
            Err(err) => {
                self.diagnostics.warn(CodecWarning::SkippedValue {
                    record: record.type_name().to_string(),
                    field: field.name.clone(),
                    reason: err.to_string(),
                });
                Slot::Skip
            }
        }
    }

    fn skipped(&self, record: &Record, field: &FieldDescriptor, value: &NativeValue) {
        self.diagnostics.warn(CodecWarning::SkippedValue {
            record: record.type_name().to_string(),
            field: field.name.clone(),
            reason: format!("expected {}, found {}", field.kind.type_name(), value.kind_name()),
        });
    }
}

impl Default for ObjectModelSerializer {
    fn default() -> Self {
        Self::new(CodecConfig::default())
    }
}

impl fmt::Debug for ObjectModelSerializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectModelSerializer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Sub-record fields that are written as their own operations when collapsing.
fn is_deferred(field: &FieldDescriptor) -> bool {
    matches!(field.kind, FieldKind::Message(_))
        && !field.is_reference()
        && !field.options.concrete
        && field.declared_mode().unwrap_or_default() != CollectionMode::Nested
}

fn check_base(
    record: &Record,
    base: Option<&Record>,
) -> std::result::Result<(), SerializationError> {
    match base {
        Some(base) if base.type_name() != record.type_name() => {
            Err(SerializationError::ForeignKind {
                expected: record.type_name().to_string(),
                actual: base.type_name().to_string(),
            })
        }
        _ => Ok(()),
    }
}

/// Flattens a concrete sub-record map into its host. Identity keys may repeat
/// with identical values; any other shared key is a collision.
fn merge_concrete(
    host: &RecordDescriptor,
    field: &FieldDescriptor,
    sub_map: ValueMap,
    data: &mut ValueMap,
) -> std::result::Result<(), SerializationError> {
    let identity = host.identity_keys();
    let mut collisions = BTreeSet::new();
    for (key, value) in sub_map {
        match data.get(&key) {
            Some(existing) if identity.contains(&key.as_str()) && *existing == value => {}
            Some(_) => {
                collisions.insert(key);
            }
            None => {
                data.insert(key, value);
            }
        }
    }
    if !collisions.is_empty() {
        return Err(SerializationError::ConcreteCollision {
            keys: collisions.into_iter().collect(),
            concrete: field.kind.type_name().to_string(),
            field: field.name.clone(),
            record: host.name().to_string(),
        });
    }
    data.insert(
        CONCRETE_TYPE_PROPERTY.to_string(),
        Value::String(field.json_name.clone()),
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    include!("tests.rs");
}
