//! Generic map to record inflation.

use crate::diagnostics::{default_sink, CodecWarning, SharedSink};
use crate::error::{DeserializationError, Result};
use crate::record::{FieldData, NativeValue, Record};
use crate::schema::{FieldDescriptor, FieldKind, RecordDescriptor};
use crate::serializer::CONCRETE_TYPE_PROPERTY;
use crate::value::coerce::{Coerced, Coercion, CoercionError};
use crate::value::{Value, ValueMap};
use std::fmt;
use std::sync::Arc;

/// Inflates generic maps into records of one type.
pub struct ObjectModelDeserializer {
    descriptor: Arc<RecordDescriptor>,
    coercion: Coercion,
    diagnostics: SharedSink,
}

impl ObjectModelDeserializer {
    pub fn new(descriptor: &Arc<RecordDescriptor>) -> Self {
        Self::with_diagnostics(descriptor, default_sink())
    }

    pub fn with_diagnostics(descriptor: &Arc<RecordDescriptor>, diagnostics: SharedSink) -> Self {
        Self {
            descriptor: Arc::clone(descriptor),
            coercion: Coercion::default(),
            diagnostics,
        }
    }

    pub fn descriptor(&self) -> &Arc<RecordDescriptor> {
        &self.descriptor
    }

    /// Builds a record of this deserializer's type from `data`.
    pub fn inflate(&self, data: &ValueMap) -> Result<Record> {
        self.build(&self.descriptor, data)
    }

    /// Builds a record of any type from `data`, recursing into sub-records.
    ///
    /// Keys not declared on the record are ignored. Null values count as absent.
    pub fn build(&self, descriptor: &Arc<RecordDescriptor>, data: &ValueMap) -> Result<Record> {
        let mut builder = Record::builder(descriptor);
        for (index, field) in descriptor.fields().iter().enumerate() {
            if field.options.ephemeral {
                continue;
            }
            let decoded = match data.get(&field.name).filter(|value| !value.is_null()) {
                Some(value) => Some(self.decode_field(descriptor, field, value)?),
                None if field.options.concrete => self.decode_concrete(field, data)?,
                None => None,
            };
            match decoded {
                Some(decoded) => builder.set_at(index, decoded),
                None if field.options.required => {
                    return Err(DeserializationError::MissingRequired {
                        record: descriptor.name().to_string(),
                        field: field.name.clone(),
                    }
                    .into());
                }
                None => {}
            }
        }
        Ok(builder.build()?)
    }

    fn decode_field(
        &self,
        descriptor: &RecordDescriptor,
        field: &FieldDescriptor,
        value: &Value,
    ) -> Result<FieldData> {
        if field.repeated {
            return self.decode_repeated(descriptor, field, value);
        }
        let native = match &field.kind {
            FieldKind::Message(sub) => {
                NativeValue::Record(self.decode_record(descriptor, field, sub, value)?)
            }
            _ => self.decode_value(descriptor, field, value)?,
        };
        Ok(FieldData::Single(native))
    }

    /// Concrete fields are read from the host map when its discriminator names them.
    fn decode_concrete(
        &self,
        field: &FieldDescriptor,
        data: &ValueMap,
    ) -> Result<Option<FieldData>> {
        let selected = data
            .get(CONCRETE_TYPE_PROPERTY)
            .and_then(Value::as_str)
            .is_some_and(|name| name.trim().eq_ignore_ascii_case(&field.json_name));
        match field.kind.as_message() {
            Some(sub) if selected => Ok(Some(FieldData::Single(NativeValue::Record(
                self.build(sub, data)?,
            )))),
            _ => Ok(None),
        }
    }

    fn decode_record(
        &self,
        descriptor: &RecordDescriptor,
        field: &FieldDescriptor,
        sub: &Arc<RecordDescriptor>,
        value: &Value,
    ) -> Result<Record> {
        match value {
            Value::Map(map) => self.build(sub, map),
            Value::Reference(path) | Value::String(path) if field.is_reference() => {
                self.inflate_reference(descriptor, field, sub, path, value)
            }
            other => Err(DeserializationError::WrongKind {
                record: descriptor.name().to_string(),
                field: field.name.clone(),
                expected: sub.name().to_string(),
                found: other.kind_name(),
            }
            .into()),
        }
    }

    /// Synthesizes the minimal record a `{collection}/{id}` reference points at.
    fn inflate_reference(
        &self,
        descriptor: &RecordDescriptor,
        field: &FieldDescriptor,
        sub: &Arc<RecordDescriptor>,
        path: &str,
        value: &Value,
    ) -> Result<Record> {
        let segments: Vec<&str> = path
            .trim_matches('/')
            .split('/')
            .filter(|segment| !segment.is_empty())
            .collect();
        let id = match segments.as_slice() {
            [_, id] => *id,
            [_, _, ..] => {
                return Err(DeserializationError::UnsupportedReference {
                    record: descriptor.name().to_string(),
                    field: field.name.clone(),
                    path: path.to_string(),
                }
                .into())
            }
            _ => {
                return Err(DeserializationError::WrongKind {
                    record: descriptor.name().to_string(),
                    field: field.name.clone(),
                    expected: format!("reference to {}", sub.name()),
                    found: value.kind_name(),
                }
                .into())
            }
        };
        let missing_key = || DeserializationError::MissingKeyStructure {
            record: descriptor.name().to_string(),
            field: field.name.clone(),
        };

        if let Some(id_field) = sub.id_field() {
            return Ok(Record::builder(sub).set(&id_field.name, id).build()?);
        }
        let key_field = sub.key_field().ok_or_else(missing_key)?;
        let key_type = key_field.kind.as_message().ok_or_else(missing_key)?;
        let key_id = key_type.id_field().ok_or_else(missing_key)?;
        let key = Record::builder(key_type).set(&key_id.name, id).build()?;
        Ok(Record::builder(sub).set(&key_field.name, key).build()?)
    }

    fn decode_repeated(
        &self,
        descriptor: &RecordDescriptor,
        field: &FieldDescriptor,
        value: &Value,
    ) -> Result<FieldData> {
        if let FieldKind::Enum(enumeration) = &field.kind {
            let numbers = self
                .coercion
                .unwrap_enum_set(value, enumeration)
                .map_err(|err| contextualize(descriptor, field, err))?;
            return Ok(FieldData::Repeated(
                numbers.into_iter().map(NativeValue::Enum).collect(),
            ));
        }

        let items = value
            .as_list()
            .ok_or_else(|| DeserializationError::WrongKind {
                record: descriptor.name().to_string(),
                field: field.name.clone(),
                expected: format!("list of {}", field.kind.type_name()),
                found: value.kind_name(),
            })?;
        let mut values = Vec::with_capacity(items.len());
        for (position, item) in items.iter().enumerate() {
            match (&field.kind, item) {
                (FieldKind::Message(sub), Value::Map(map)) => {
                    values.push(NativeValue::Record(self.build(sub, map)?));
                }
                (FieldKind::Message(_), _) => {
                    return Err(DeserializationError::InvalidElement {
                        record: descriptor.name().to_string(),
                        field: field.name.clone(),
                        position,
                    }
                    .into());
                }
                (_, Value::Null) => {}
                (_, item) => values.push(self.decode_value(descriptor, field, item)?),
            }
        }
        Ok(FieldData::Repeated(values))
    }

    fn decode_value(
        &self,
        descriptor: &RecordDescriptor,
        field: &FieldDescriptor,
        value: &Value,
    ) -> Result<NativeValue> {
        match self.coercion.unwrap(value, &field.kind) {
            Ok(Coerced::Exact(native)) => Ok(native),
            Ok(Coerced::Fallback(native)) => {
                self.diagnostics.warn(CodecWarning::PrecisionFallback {
                    record: descriptor.name().to_string(),
                    field: field.name.clone(),
                    value: value.to_json().to_string(),
                });
                Ok(native)
            }
            Err(err) => Err(contextualize(descriptor, field, err).into()),
        }
    }
}

impl fmt::Debug for ObjectModelDeserializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectModelDeserializer")
            .field("record", &self.descriptor.name())
            .finish_non_exhaustive()
    }
}

fn contextualize(
    descriptor: &RecordDescriptor,
    field: &FieldDescriptor,
    err: CoercionError,
) -> DeserializationError {
    let record = descriptor.name().to_string();
    let field = field.name.clone();
    match err {
        CoercionError::WrongKind { expected, found } => DeserializationError::WrongKind {
            record,
            field,
            expected,
            found,
        },
        CoercionError::UnresolvedEnum(value) => DeserializationError::UnresolvedEnum {
            record,
            field,
            value,
        },
        CoercionError::InvalidBytes(reason) => DeserializationError::InvalidBytes {
            record,
            field,
            reason,
        },
        CoercionError::InvalidTimestamp(reason) => DeserializationError::InvalidTimestamp {
            record,
            field,
            reason,
        },
        CoercionError::OutOfRange(value) => DeserializationError::OutOfRange {
            record,
            field,
            value,
        },
    }
}
