use super::descriptor::{EnumDescriptor, RecordDescriptor};
use super::file;
use crate::error::SchemaResolutionError;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};

/// Registry of record and enum types.
///
/// Stores resolved descriptors with lookup by type name.
/// Provides thread-safe registration and retrieval.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    records: RwLock<HashMap<String, Arc<RecordDescriptor>>>,
    enums: RwLock<HashMap<String, Arc<EnumDescriptor>>>,
}

impl SchemaRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads and resolves a TOML schema file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SchemaResolutionError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| SchemaResolutionError::Io(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parses and resolves a TOML schema.
    pub fn from_toml(toml_str: &str) -> Result<Self, SchemaResolutionError> {
        let resolved = file::resolve(toml_str)?;
        let registry = Self::new();
        for descriptor in resolved.enums {
            registry.register_enum(descriptor)?;
        }
        for descriptor in resolved.records {
            registry.register(descriptor)?;
        }
        tracing::debug!(
            records = registry.record_names().len(),
            "schema resolved"
        );
        Ok(registry)
    }

    /// Registers a record type.
    ///
    /// # Returns
    /// `Ok(())` if successful, `Err` if a record with the same name is already registered.
    pub fn register(&self, descriptor: Arc<RecordDescriptor>) -> Result<(), SchemaResolutionError> {
        let mut records = self
            .records
            .write()
            .map_err(|_| SchemaResolutionError::LockPoisoned)?;
        if records.contains_key(descriptor.name()) {
            return Err(SchemaResolutionError::AlreadyRegistered(
                descriptor.name().to_string(),
            ));
        }
        records.insert(descriptor.name().to_string(), descriptor);
        Ok(())
    }

    /// Registers an enum type.
    pub fn register_enum(
        &self,
        descriptor: Arc<EnumDescriptor>,
    ) -> Result<(), SchemaResolutionError> {
        let mut enums = self
            .enums
            .write()
            .map_err(|_| SchemaResolutionError::LockPoisoned)?;
        if enums.contains_key(descriptor.name()) {
            return Err(SchemaResolutionError::AlreadyRegistered(
                descriptor.name().to_string(),
            ));
        }
        enums.insert(descriptor.name().to_string(), descriptor);
        Ok(())
    }

    /// Retrieves a record type by name.
    pub fn get(&self, name: &str) -> Option<Arc<RecordDescriptor>> {
        let records = self.records.read().ok()?;
        records.get(name).cloned()
    }

    /// Retrieves a record type by name, failing if it is unknown.
    pub fn require(&self, name: &str) -> Result<Arc<RecordDescriptor>, SchemaResolutionError> {
        self.get(name)
            .ok_or_else(|| SchemaResolutionError::RecordNotFound(name.to_string()))
    }

    pub fn get_enum(&self, name: &str) -> Option<Arc<EnumDescriptor>> {
        let enums = self.enums.read().ok()?;
        enums.get(name).cloned()
    }

    /// Checks if a record type is registered.
    pub fn contains(&self, name: &str) -> bool {
        match self.records.read() {
            Ok(records) => records.contains_key(name),
            Err(_) => false,
        }
    }

    /// Returns all registered record names, sorted.
    pub fn record_names(&self) -> Vec<String> {
        let records = match self.records.read() {
            Ok(guard) => guard,
            Err(_) => return Vec::new(),
        };
        let mut names: Vec<String> = records.keys().cloned().collect();
        names.sort();
        names
    }
}
