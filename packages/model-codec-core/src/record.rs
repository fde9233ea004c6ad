//! Schema-typed records.
//!
//! A [`Record`] is an immutable value bound to its [`RecordDescriptor`]. Records are
//! assembled through [`RecordBuilder`]; field errors surface from `build()`.

use crate::error::SchemaResolutionError;
use crate::schema::{FieldKind, RecordDescriptor, ScalarKind};
use std::fmt;
use std::sync::Arc;

/// Point in time as seconds and nanoseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Timestamp {
    pub seconds: i64,
    pub nanos: i32,
}

impl Timestamp {
    pub fn new(seconds: i64, nanos: i32) -> Self {
        Self { seconds, nanos }
    }

    pub fn from_millis(millis: i64) -> Self {
        Self {
            seconds: millis.div_euclid(1000),
            nanos: (millis.rem_euclid(1000) * 1_000_000) as i32,
        }
    }

    pub fn is_epoch(&self) -> bool {
        self.seconds == 0 && self.nanos == 0
    }
}

/// In-memory field value.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeValue {
    Bool(bool),
    /// Signed integral kinds
    Int(i64),
    /// Unsigned integral kinds
    UInt(u64),
    Float(f32),
    Double(f64),
    String(String),
    Bytes(Vec<u8>),
    /// Enum value number
    Enum(i32),
    Timestamp(Timestamp),
    Record(Record),
}

impl NativeValue {
    pub fn kind_name(&self) -> &'static str {
        match self {
            NativeValue::Bool(_) => "bool",
            NativeValue::Int(_) => "int",
            NativeValue::UInt(_) => "uint",
            NativeValue::Float(_) => "float",
            NativeValue::Double(_) => "double",
            NativeValue::String(_) => "string",
            NativeValue::Bytes(_) => "bytes",
            NativeValue::Enum(_) => "enum",
            NativeValue::Timestamp(_) => "timestamp",
            NativeValue::Record(_) => "record",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            NativeValue::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            NativeValue::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Zero value for a field kind. Record kinds have none.
    pub fn default_for(kind: &FieldKind) -> Option<NativeValue> {
        let value = match kind {
            FieldKind::Scalar(scalar) => match scalar {
                ScalarKind::Bool => NativeValue::Bool(false),
                ScalarKind::Float => NativeValue::Float(0.0),
                ScalarKind::Double => NativeValue::Double(0.0),
                ScalarKind::String => NativeValue::String(String::new()),
                ScalarKind::Bytes => NativeValue::Bytes(Vec::new()),
                s if s.is_unsigned() => NativeValue::UInt(0),
                _ => NativeValue::Int(0),
            },
            FieldKind::Enum(descriptor) => NativeValue::Enum(descriptor.default_number()),
            FieldKind::Timestamp => NativeValue::Timestamp(Timestamp::default()),
            FieldKind::Message(_) => return None,
        };
        Some(value)
    }

    /// Whether this value is the zero value of its own variant.
    fn is_zero(&self, kind: &FieldKind) -> bool {
        match self {
            NativeValue::Bool(value) => !value,
            NativeValue::Int(value) => *value == 0,
            NativeValue::UInt(value) => *value == 0,
            NativeValue::Float(value) => *value == 0.0,
            NativeValue::Double(value) => *value == 0.0,
            NativeValue::String(value) => value.is_empty(),
            NativeValue::Bytes(value) => value.is_empty(),
            NativeValue::Enum(number) => match kind {
                FieldKind::Enum(descriptor) => *number == descriptor.default_number(),
                _ => false,
            },
            NativeValue::Timestamp(value) => value.is_epoch(),
            NativeValue::Record(_) => false,
        }
    }
}

macro_rules! native_from {
    ($($source:ty => $variant:ident as $target:ty),* $(,)?) => {
        $(impl From<$source> for NativeValue {
            fn from(value: $source) -> Self {
                NativeValue::$variant(<$target>::from(value))
            }
        })*
    };
}

native_from! {
    bool => Bool as bool,
    i32 => Int as i64,
    i64 => Int as i64,
    u32 => UInt as u64,
    u64 => UInt as u64,
    f32 => Float as f32,
    f64 => Double as f64,
    String => String as String,
    &str => String as String,
    Vec<u8> => Bytes as Vec<u8>,
    Timestamp => Timestamp as Timestamp,
    Record => Record as Record,
}

/// Stored data of a set field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldData {
    Single(NativeValue),
    Repeated(Vec<NativeValue>),
}

/// Immutable, schema-typed record.
#[derive(Clone)]
pub struct Record {
    descriptor: Arc<RecordDescriptor>,
    entries: Vec<Option<FieldData>>,
}

impl Record {
    /// Starts a builder for the given record type.
    pub fn builder(descriptor: &Arc<RecordDescriptor>) -> RecordBuilder {
        RecordBuilder::new(descriptor)
    }

    /// Record with no fields set.
    pub fn empty(descriptor: &Arc<RecordDescriptor>) -> Self {
        Self {
            descriptor: Arc::clone(descriptor),
            entries: vec![None; descriptor.fields().len()],
        }
    }

    pub fn descriptor(&self) -> &Arc<RecordDescriptor> {
        &self.descriptor
    }

    pub fn type_name(&self) -> &str {
        self.descriptor.name()
    }

    pub fn get(&self, name: &str) -> Option<&FieldData> {
        self.descriptor
            .field_index(name)
            .and_then(|index| self.get_at(index))
    }

    pub(crate) fn get_at(&self, index: usize) -> Option<&FieldData> {
        self.entries.get(index).and_then(Option::as_ref)
    }

    /// Value of a singular field.
    pub fn value(&self, name: &str) -> Option<&NativeValue> {
        match self.get(name)? {
            FieldData::Single(value) => Some(value),
            FieldData::Repeated(_) => None,
        }
    }

    /// Values of a repeated field; empty when unset.
    pub fn repeated(&self, name: &str) -> &[NativeValue] {
        match self.get(name) {
            Some(FieldData::Repeated(values)) => values,
            _ => &[],
        }
    }

    /// Sub-record held by a singular field.
    pub fn record(&self, name: &str) -> Option<&Record> {
        self.value(name).and_then(NativeValue::as_record)
    }

    pub fn string(&self, name: &str) -> Option<&str> {
        self.value(name).and_then(NativeValue::as_str)
    }

    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn to_builder(&self) -> RecordBuilder {
        RecordBuilder {
            descriptor: Arc::clone(&self.descriptor),
            entries: self.entries.clone(),
            error: None,
        }
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.descriptor.name() == other.descriptor.name() && self.entries == other.entries
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct(self.descriptor.name());
        for (field, entry) in self.descriptor.fields().iter().zip(&self.entries) {
            match entry {
                Some(FieldData::Single(value)) => {
                    out.field(&field.name, value);
                }
                Some(FieldData::Repeated(values)) => {
                    out.field(&field.name, values);
                }
                None => {}
            }
        }
        out.finish()
    }
}

/// Builder for [`Record`].
///
/// Setters never fail; the first error is reported by [`RecordBuilder::build`].
#[derive(Clone)]
pub struct RecordBuilder {
    descriptor: Arc<RecordDescriptor>,
    entries: Vec<Option<FieldData>>,
    error: Option<SchemaResolutionError>,
}

impl RecordBuilder {
    pub fn new(descriptor: &Arc<RecordDescriptor>) -> Self {
        Self {
            descriptor: Arc::clone(descriptor),
            entries: vec![None; descriptor.fields().len()],
            error: None,
        }
    }

    /// Sets a singular field.
    pub fn set(mut self, name: &str, value: impl Into<NativeValue>) -> Self {
        if let Some(index) = self.slot(name, false) {
            self.entries[index] = Some(FieldData::Single(value.into()));
        }
        self
    }

    /// Appends to a repeated field.
    pub fn push(mut self, name: &str, value: impl Into<NativeValue>) -> Self {
        if let Some(index) = self.slot(name, true) {
            match &mut self.entries[index] {
                Some(FieldData::Repeated(values)) => values.push(value.into()),
                entry => *entry = Some(FieldData::Repeated(vec![value.into()])),
            }
        }
        self
    }

    /// Appends every value to a repeated field.
    pub fn extend<V: Into<NativeValue>>(
        mut self,
        name: &str,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        if let Some(index) = self.slot(name, true) {
            let mut current = match self.entries[index].take() {
                Some(FieldData::Repeated(values)) => values,
                _ => Vec::new(),
            };
            current.extend(values.into_iter().map(Into::into));
            self.entries[index] = Some(FieldData::Repeated(current));
        }
        self
    }

    /// Unsets a field.
    pub fn clear(mut self, name: &str) -> Self {
        if let Some(index) = self.descriptor.field_index(name) {
            self.entries[index] = None;
        }
        self
    }

    pub(crate) fn set_at(&mut self, index: usize, data: FieldData) {
        self.entries[index] = Some(data);
    }

    /// Finishes the record, dropping default scalars and empty lists.
    pub fn build(self) -> Result<Record, SchemaResolutionError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let mut entries = self.entries;
        for (field, entry) in self.descriptor.fields().iter().zip(entries.iter_mut()) {
            let unset = match entry {
                Some(FieldData::Single(value)) => value.is_zero(&field.kind),
                Some(FieldData::Repeated(values)) => values.is_empty(),
                None => false,
            };
            if unset {
                *entry = None;
            }
        }
        Ok(Record {
            descriptor: self.descriptor,
            entries,
        })
    }

    fn slot(&mut self, name: &str, repeated: bool) -> Option<usize> {
        if self.error.is_some() {
            return None;
        }
        let record = self.descriptor.name();
        let Some(index) = self.descriptor.field_index(name) else {
            self.error = Some(SchemaResolutionError::UnknownField {
                record: record.to_string(),
                field: name.to_string(),
            });
            return None;
        };
        let declared = self.descriptor.fields()[index].repeated;
        if declared != repeated {
            self.error = Some(SchemaResolutionError::InvalidShape {
                record: record.to_string(),
                field: name.to_string(),
                message: if declared {
                    "is repeated; use push or extend"
                } else {
                    "is singular; use set"
                },
            });
            return None;
        }
        Some(index)
    }
}
