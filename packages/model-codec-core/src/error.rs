//! Codec error types.

use thiserror::Error;

/// Schema construction and lookup errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaResolutionError {
    /// Field references a type that is neither a scalar, an enum, nor a record
    #[error("Unknown type '{type_name}' for field '{field}' on record '{record}'")]
    UnknownType {
        record: String,
        field: String,
        type_name: String,
    },

    /// Record type not registered
    #[error("Record type '{0}' not found")]
    RecordNotFound(String),

    /// Record type already registered
    #[error("Record type '{0}' already registered")]
    AlreadyRegistered(String),

    /// Field declared twice on the same record
    #[error("Field '{field}' declared more than once on record '{record}'")]
    DuplicateField { record: String, field: String },

    /// Field name not present on the record type
    #[error("Field '{field}' not found on record '{record}'")]
    UnknownField { record: String, field: String },

    /// Field annotation is not valid for the field's type or shape
    #[error("Invalid annotation on field '{field}' of record '{record}': {message}")]
    InvalidAnnotation {
        record: String,
        field: String,
        message: String,
    },

    /// Value shape does not match the field's repetition
    #[error("Field '{field}' on record '{record}' {message}")]
    InvalidShape {
        record: String,
        field: String,
        message: &'static str,
    },

    /// KEY-annotated type without an ID field
    #[error("Key type '{key_type}' for field '{field}' on record '{record}' declares no ID field")]
    MissingKeyId {
        record: String,
        field: String,
        key_type: String,
    },

    /// Record types that contain themselves
    #[error("Cyclic record type reference through '{0}'")]
    CyclicType(String),

    /// Enum without values
    #[error("Enum '{0}' declares no values")]
    EmptyEnum(String),

    /// Schema source could not be parsed
    #[error("Schema parse error: {0}")]
    Parse(String),

    /// Schema source could not be read
    #[error("I/O error: {0}")]
    Io(String),

    /// Lock poisoned (RwLock poisoned)
    #[error("Lock poisoned")]
    LockPoisoned,
}

/// Failures while deflating or collapsing a record.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SerializationError {
    /// Record has no resolvable ID
    #[error("Unable to resolve ID for record '{record}'")]
    MissingId { record: String },

    /// Record ID resolved to a blank string
    #[error("Record '{record}' has a blank ID")]
    BlankId { record: String },

    /// Reference or parent field could not be resolved to a path
    #[error("Unable to resolve reference at field '{field}' on record '{record}': {reason}")]
    UnresolvedReference {
        record: String,
        field: String,
        reason: String,
    },

    /// Parent record supplied to collapse has no ID
    #[error("Cannot serialize with parent entity '{record}' with undefined ID")]
    MissingParentId { record: String },

    /// Concrete sub-record fields collide with host properties
    #[error("Cannot handle property collisions for concrete model: {} on `{concrete}`, at field `{field}` on `{record}`", format_keys(.keys))]
    ConcreteCollision {
        keys: Vec<String>,
        concrete: String,
        field: String,
        record: String,
    },

    /// Collection path resolved to a blank string
    #[error("Failed to calculate collection path for type '{record}'")]
    MissingCollectionPath { record: String },

    /// Required field without a value
    #[error("Required field was missing a value: `{field}` on record `{record}`")]
    MissingRequired { record: String, field: String },

    /// Record of another type handed to a typed serializer or used as a base
    #[error("Unable to serialize '{actual}' with a serializer or base of kind '{expected}'")]
    ForeignKind { expected: String, actual: String },
}

/// Failures while inflating a record from a generic map.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DeserializationError {
    /// Input value kind does not fit the declared field type
    #[error("Found {found} value where {expected} was expected, in field '{field}' on entity '{record}'")]
    WrongKind {
        record: String,
        field: String,
        expected: String,
        found: &'static str,
    },

    /// Enum name or number does not resolve
    #[error("Unable to resolve enum value '{value}' for field '{field}' on entity '{record}'")]
    UnresolvedEnum {
        record: String,
        field: String,
        value: String,
    },

    /// Required field absent from input
    #[error("Unable to resolve required field '{field}' on message '{record}'")]
    MissingRequired { record: String, field: String },

    /// Reference with more than one ancestor level
    #[error("Recursive inflation of reference '{path}' is not supported, at field '{field}' on entity '{record}'")]
    UnsupportedReference {
        record: String,
        field: String,
        path: String,
    },

    /// Reference target type has no ID structure to fill
    #[error("Could not resolve key structure ID field for reference inflate, at field '{field}' on entity '{record}'")]
    MissingKeyStructure { record: String, field: String },

    /// Bytes field with undecodable text
    #[error("Invalid base64 data in field '{field}' on entity '{record}': {reason}")]
    InvalidBytes {
        record: String,
        field: String,
        reason: String,
    },

    /// Timestamp field with undecodable input
    #[error("Failed to decode timestamp/instant at field '{field}' on entity '{record}': {reason}")]
    InvalidTimestamp {
        record: String,
        field: String,
        reason: String,
    },

    /// Integral value outside of the field's range
    #[error("Value {value} out of range for field '{field}' on entity '{record}'")]
    OutOfRange {
        record: String,
        field: String,
        value: String,
    },

    /// Element of a repeated sub-record field is not a map
    #[error("Cannot identify type for message in repeated field '{field}' at position '{position}' on entity '{record}'")]
    InvalidElement {
        record: String,
        field: String,
        position: usize,
    },
}

/// Umbrella error for codec operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodecError {
    #[error(transparent)]
    Schema(#[from] SchemaResolutionError),

    #[error(transparent)]
    Serialization(#[from] SerializationError),

    #[error(transparent)]
    Deserialization(#[from] DeserializationError),
}

/// Write proxy errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WriteError {
    /// Create against an existing document
    #[error("Document already exists at '{path}'")]
    Conflict { path: String },

    /// Update against a missing document
    #[error("Document not found at '{path}'")]
    NotFound { path: String },

    /// Lock poisoned (RwLock poisoned)
    #[error("Lock poisoned")]
    LockPoisoned,
}

/// Configuration loading errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(String),

    #[error("Invalid TOML: {0}")]
    Parse(String),

    /// Environment variable with an unparseable value
    #[error("Invalid {name}: {value}")]
    InvalidOverride { name: &'static str, value: String },
}

/// Result alias for codec operations.
pub type Result<T, E = CodecError> = std::result::Result<T, E>;

fn format_keys(keys: &[String]) -> String {
    keys.iter()
        .map(|key| format!("`{}`", key))
        .collect::<Vec<_>>()
        .join(", ")
}
