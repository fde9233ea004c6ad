//! ID, parent, and path resolution for records.

use crate::error::SerializationError;
use crate::record::Record;
use crate::schema::RecordDescriptor;

/// Finds the record's ID, directly or inside its KEY object.
pub(crate) fn resolve_id(record: &Record) -> Result<&str, SerializationError> {
    let descriptor = record.descriptor();
    let missing = || SerializationError::MissingId {
        record: descriptor.name().to_string(),
    };

    let container = if descriptor.id_field().is_some() {
        record
    } else if let Some(key_field) = descriptor.key_field() {
        record.record(&key_field.name).ok_or_else(missing)?
    } else {
        return Err(missing());
    };

    let id_field = container.descriptor().id_field().ok_or_else(missing)?;
    let id = container.string(&id_field.name).ok_or_else(missing)?;
    if id.trim().is_empty() {
        return Err(SerializationError::BlankId {
            record: descriptor.name().to_string(),
        });
    }
    Ok(id)
}

/// Finds the parent record through a PARENT field on the record or its KEY object.
pub(crate) fn resolve_parent(record: &Record) -> Option<&Record> {
    parent_of(record).or_else(|| {
        record
            .descriptor()
            .key_field()
            .and_then(|key| record.record(&key.name))
            .and_then(parent_of)
    })
}

fn parent_of(record: &Record) -> Option<&Record> {
    record
        .descriptor()
        .parent_field()
        .and_then(|field| record.record(&field.name))
}

/// Storage collection of a record type: explicit path, or the pluralized,
/// lower-cased type name.
pub fn collection_path(descriptor: &RecordDescriptor) -> Result<String, SerializationError> {
    match descriptor.storage().and_then(|storage| storage.path.as_deref()) {
        Some(path) if path.trim().is_empty() => Err(SerializationError::MissingCollectionPath {
            record: descriptor.name().to_string(),
        }),
        Some(path) => Ok(path.trim_matches('/').to_string()),
        None => Ok(default_collection_path(descriptor.name())),
    }
}

pub(crate) fn default_collection_path(name: &str) -> String {
    let lower = name.to_lowercase();
    if name.ends_with('s') {
        lower
    } else {
        format!("{}s", lower)
    }
}

/// `{collection}/{id}`.
pub fn reference_value(collection: &str, id: &str) -> String {
    format!("{}/{}", collection, id)
}

/// Fully resolved path of a record: ancestor paths, then `{collection}/{id}`.
pub fn record_path(record: &Record) -> Result<String, SerializationError> {
    let id = resolve_id(record)?;
    let own = reference_value(&collection_path(record.descriptor())?, id);
    match resolve_parent(record) {
        Some(parent) => Ok(format!("{}/{}", record_path(parent)?, own)),
        None => Ok(own),
    }
}
