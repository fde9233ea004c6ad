use super::validation;
use crate::error::SchemaResolutionError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Scalar field types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Bool,
    Int32,
    Int64,
    UInt32,
    UInt64,
    SInt32,
    SInt64,
    Fixed32,
    Fixed64,
    SFixed32,
    SFixed64,
    Float,
    Double,
    String,
    Bytes,
}

impl ScalarKind {
    pub const ALL: [ScalarKind; 15] = [
        ScalarKind::Bool,
        ScalarKind::Int32,
        ScalarKind::Int64,
        ScalarKind::UInt32,
        ScalarKind::UInt64,
        ScalarKind::SInt32,
        ScalarKind::SInt64,
        ScalarKind::Fixed32,
        ScalarKind::Fixed64,
        ScalarKind::SFixed32,
        ScalarKind::SFixed64,
        ScalarKind::Float,
        ScalarKind::Double,
        ScalarKind::String,
        ScalarKind::Bytes,
    ];

    /// Schema-file name of the kind.
    pub fn name(self) -> &'static str {
        match self {
            ScalarKind::Bool => "bool",
            ScalarKind::Int32 => "int32",
            ScalarKind::Int64 => "int64",
            ScalarKind::UInt32 => "uint32",
            ScalarKind::UInt64 => "uint64",
            ScalarKind::SInt32 => "sint32",
            ScalarKind::SInt64 => "sint64",
            ScalarKind::Fixed32 => "fixed32",
            ScalarKind::Fixed64 => "fixed64",
            ScalarKind::SFixed32 => "sfixed32",
            ScalarKind::SFixed64 => "sfixed64",
            ScalarKind::Float => "float",
            ScalarKind::Double => "double",
            ScalarKind::String => "string",
            ScalarKind::Bytes => "bytes",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.name() == name)
    }

    pub fn is_integral(self) -> bool {
        !matches!(
            self,
            ScalarKind::Bool
                | ScalarKind::Float
                | ScalarKind::Double
                | ScalarKind::String
                | ScalarKind::Bytes
        )
    }

    pub fn is_unsigned(self) -> bool {
        matches!(
            self,
            ScalarKind::UInt32 | ScalarKind::UInt64 | ScalarKind::Fixed32 | ScalarKind::Fixed64
        )
    }

    pub fn is_floating(self) -> bool {
        matches!(self, ScalarKind::Float | ScalarKind::Double)
    }

    pub fn is_32bit(self) -> bool {
        matches!(
            self,
            ScalarKind::Int32
                | ScalarKind::UInt32
                | ScalarKind::SInt32
                | ScalarKind::Fixed32
                | ScalarKind::SFixed32
                | ScalarKind::Float
        )
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Resolved type of a field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Scalar(ScalarKind),
    Enum(Arc<EnumDescriptor>),
    /// Well-known timestamp type
    Timestamp,
    Message(Arc<RecordDescriptor>),
}

impl FieldKind {
    /// Type name as written in schema files.
    pub fn type_name(&self) -> &str {
        match self {
            FieldKind::Scalar(kind) => kind.name(),
            FieldKind::Enum(descriptor) => descriptor.name(),
            FieldKind::Timestamp => "timestamp",
            FieldKind::Message(descriptor) => descriptor.name(),
        }
    }

    pub fn as_message(&self) -> Option<&Arc<RecordDescriptor>> {
        match self {
            FieldKind::Message(descriptor) => Some(descriptor),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<&Arc<EnumDescriptor>> {
        match self {
            FieldKind::Enum(descriptor) => Some(descriptor),
            _ => None,
        }
    }
}

/// Persistence role of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldRole {
    /// Holds the record's identifier
    Id,
    /// Sub-record whose ID field identifies the owner
    Key,
    /// Sub-record pointing at the owning record
    Parent,
    /// Sub-record written as a reference path
    Reference,
}

impl FromStr for FieldRole {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "id" => Ok(FieldRole::Id),
            "key" => Ok(FieldRole::Key),
            "parent" => Ok(FieldRole::Parent),
            "reference" => Ok(FieldRole::Reference),
            _ => Err(()),
        }
    }
}

/// Where a sub-record is materialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionMode {
    /// Embedded in the owner's payload
    #[default]
    Nested,
    /// Separate write under the owner's path
    Collection,
    /// Separate write in a grouped collection
    Group,
}

impl FromStr for CollectionMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nested" => Ok(CollectionMode::Nested),
            "collection" => Ok(CollectionMode::Collection),
            "group" => Ok(CollectionMode::Group),
            _ => Err(()),
        }
    }
}

impl fmt::Display for CollectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectionMode::Nested => f.write_str("nested"),
            CollectionMode::Collection => f.write_str("collection"),
            CollectionMode::Group => f.write_str("group"),
        }
    }
}

/// Field-level collection annotation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CollectionSettings {
    pub mode: Option<CollectionMode>,
    pub path: Option<String>,
    /// Discriminator stamped on every element written from this field
    pub concrete: Option<String>,
}

/// Record-level storage annotation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub mode: Option<CollectionMode>,
    pub path: Option<String>,
}

/// Persistence annotations carried by a field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldOptions {
    pub role: Option<FieldRole>,
    pub concrete: bool,
    pub ephemeral: bool,
    pub required: bool,
    pub explicit: bool,
    pub collection: Option<CollectionSettings>,
}

/// A single declared field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    /// External name; used as the concrete discriminator
    pub json_name: String,
    pub kind: FieldKind,
    pub repeated: bool,
    pub options: FieldOptions,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        let name = name.into();
        Self {
            json_name: lower_camel(&name),
            name,
            kind,
            repeated: false,
            options: FieldOptions::default(),
        }
    }

    pub fn scalar(name: impl Into<String>, kind: ScalarKind) -> Self {
        Self::new(name, FieldKind::Scalar(kind))
    }

    pub fn message(name: impl Into<String>, descriptor: &Arc<RecordDescriptor>) -> Self {
        Self::new(name, FieldKind::Message(Arc::clone(descriptor)))
    }

    pub fn enumeration(name: impl Into<String>, descriptor: &Arc<EnumDescriptor>) -> Self {
        Self::new(name, FieldKind::Enum(Arc::clone(descriptor)))
    }

    pub fn timestamp(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Timestamp)
    }

    pub fn repeated(mut self) -> Self {
        self.repeated = true;
        self
    }

    pub fn role(mut self, role: FieldRole) -> Self {
        self.options.role = Some(role);
        self
    }

    pub fn json_name(mut self, json_name: impl Into<String>) -> Self {
        self.json_name = json_name.into();
        self
    }

    pub fn concrete(mut self) -> Self {
        self.options.concrete = true;
        self
    }

    pub fn ephemeral(mut self) -> Self {
        self.options.ephemeral = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.options.required = true;
        self
    }

    pub fn explicit(mut self) -> Self {
        self.options.explicit = true;
        self
    }

    pub fn collection(mut self, settings: CollectionSettings) -> Self {
        self.options.collection = Some(settings);
        self
    }

    pub fn has_role(&self, role: FieldRole) -> bool {
        self.options.role == Some(role)
    }

    /// True for REFERENCE and PARENT fields, which are written as paths.
    pub fn is_reference(&self) -> bool {
        matches!(
            self.options.role,
            Some(FieldRole::Reference) | Some(FieldRole::Parent)
        )
    }

    /// Collection mode declared on the field, else on the field's record type.
    pub fn declared_mode(&self) -> Option<CollectionMode> {
        self.options
            .collection
            .as_ref()
            .and_then(|settings| settings.mode)
            .or_else(|| {
                self.kind
                    .as_message()
                    .and_then(|descriptor| descriptor.storage())
                    .and_then(|storage| storage.mode)
            })
    }
}

/// A named enum value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumValue {
    pub name: String,
    pub number: i32,
}

/// Enum type with ordered values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDescriptor {
    name: String,
    values: Vec<EnumValue>,
}

impl EnumDescriptor {
    pub fn new(
        name: impl Into<String>,
        values: Vec<EnumValue>,
    ) -> Result<Arc<Self>, SchemaResolutionError> {
        let name = name.into();
        if values.is_empty() {
            return Err(SchemaResolutionError::EmptyEnum(name));
        }
        Ok(Arc::new(Self { name, values }))
    }

    /// Builds an enum from `(name, number)` pairs.
    pub fn from_pairs(
        name: impl Into<String>,
        pairs: &[(&str, i32)],
    ) -> Result<Arc<Self>, SchemaResolutionError> {
        let values = pairs
            .iter()
            .map(|(name, number)| EnumValue {
                name: name.to_string(),
                number: *number,
            })
            .collect();
        Self::new(name, values)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &[EnumValue] {
        &self.values
    }

    /// Case-insensitive lookup by value name.
    pub fn find_by_name(&self, name: &str) -> Option<&EnumValue> {
        let name = name.trim();
        self.values
            .iter()
            .find(|value| value.name.eq_ignore_ascii_case(name))
    }

    pub fn find_by_number(&self, number: i32) -> Option<&EnumValue> {
        self.values.iter().find(|value| value.number == number)
    }

    /// Number of the first declared value.
    pub fn default_number(&self) -> i32 {
        self.values.first().map(|value| value.number).unwrap_or(0)
    }
}

/// Record type: ordered fields plus storage annotations.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordDescriptor {
    name: String,
    fields: Vec<FieldDescriptor>,
    storage: Option<StorageSettings>,
    id_index: Option<usize>,
    key_index: Option<usize>,
    parent_index: Option<usize>,
}

impl RecordDescriptor {
    pub fn builder(name: impl Into<String>) -> RecordDescriptorBuilder {
        RecordDescriptorBuilder {
            name: name.into(),
            fields: Vec::new(),
            storage: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|field| field.name == name)
    }

    pub fn storage(&self) -> Option<&StorageSettings> {
        self.storage.as_ref()
    }

    pub fn id_field(&self) -> Option<&FieldDescriptor> {
        self.id_index.map(|index| &self.fields[index])
    }

    pub fn key_field(&self) -> Option<&FieldDescriptor> {
        self.key_index.map(|index| &self.fields[index])
    }

    pub fn parent_field(&self) -> Option<&FieldDescriptor> {
        self.parent_index.map(|index| &self.fields[index])
    }

    /// Names of the ID and KEY fields.
    pub fn identity_keys(&self) -> Vec<&str> {
        [self.id_index, self.key_index]
            .into_iter()
            .flatten()
            .map(|index| self.fields[index].name.as_str())
            .collect()
    }
}

/// Builder for [`RecordDescriptor`]; annotation rules are checked in `build`.
#[derive(Debug, Clone)]
pub struct RecordDescriptorBuilder {
    name: String,
    fields: Vec<FieldDescriptor>,
    storage: Option<StorageSettings>,
}

impl RecordDescriptorBuilder {
    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    pub fn fields(mut self, fields: impl IntoIterator<Item = FieldDescriptor>) -> Self {
        self.fields.extend(fields);
        self
    }

    pub fn storage(mut self, storage: StorageSettings) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Shorthand for a storage annotation with only a path.
    pub fn path(self, path: impl Into<String>) -> Self {
        let mode = self.storage.as_ref().and_then(|storage| storage.mode);
        self.storage(StorageSettings {
            mode,
            path: Some(path.into()),
        })
    }

    /// Shorthand for a storage annotation with only a mode.
    pub fn mode(self, mode: CollectionMode) -> Self {
        let path = self.storage.as_ref().and_then(|storage| storage.path.clone());
        self.storage(StorageSettings {
            mode: Some(mode),
            path,
        })
    }

    pub fn build(self) -> Result<Arc<RecordDescriptor>, SchemaResolutionError> {
        let indexes = validation::validate_fields(&self.name, &self.fields)?;
        Ok(Arc::new(RecordDescriptor {
            name: self.name,
            fields: self.fields,
            storage: self.storage,
            id_index: indexes.id,
            key_index: indexes.key,
            parent_index: indexes.parent,
        }))
    }
}

/// `snake_case` to `lowerCamelCase`.
pub(crate) fn lower_camel(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;
    for ch in name.chars() {
        if ch == '_' {
            upper_next = !out.is_empty();
        } else if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}
