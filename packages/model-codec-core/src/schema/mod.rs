//! Record schemas: field kinds, persistence annotations, and the type registry.

mod descriptor;
mod file;
mod registry;
pub(crate) mod validation;

pub use descriptor::{
    CollectionMode, CollectionSettings, EnumDescriptor, EnumValue, FieldDescriptor, FieldKind,
    FieldOptions, FieldRole, RecordDescriptor, RecordDescriptorBuilder, ScalarKind,
    StorageSettings,
};
pub use registry::SchemaRegistry;
