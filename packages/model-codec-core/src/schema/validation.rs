//! Annotation rules for record descriptors.

use super::descriptor::{FieldDescriptor, FieldKind, FieldRole, ScalarKind};
use crate::error::SchemaResolutionError;
use std::collections::HashSet;

/// Positions of the identity-bearing fields.
#[derive(Debug, Default)]
pub(crate) struct RoleIndexes {
    pub id: Option<usize>,
    pub key: Option<usize>,
    pub parent: Option<usize>,
}

/// Validates field annotations and returns the role indexes.
pub(crate) fn validate_fields(
    record: &str,
    fields: &[FieldDescriptor],
) -> Result<RoleIndexes, SchemaResolutionError> {
    let mut seen = HashSet::with_capacity(fields.len());
    let mut indexes = RoleIndexes::default();

    for (index, field) in fields.iter().enumerate() {
        if !seen.insert(field.name.as_str()) {
            return Err(SchemaResolutionError::DuplicateField {
                record: record.to_string(),
                field: field.name.clone(),
            });
        }
        let invalid = |message: &str| SchemaResolutionError::InvalidAnnotation {
            record: record.to_string(),
            field: field.name.clone(),
            message: message.to_string(),
        };

        let is_message = matches!(field.kind, FieldKind::Message(_));
        let options = &field.options;

        if options.ephemeral && options.role.is_some() {
            return Err(invalid("ephemeral fields cannot carry a persistence role"));
        }
        if options.concrete {
            if field.repeated {
                return Err(invalid("`concrete` cannot annotate a repeated field"));
            }
            if !is_message {
                return Err(invalid("`concrete` requires a record-typed field"));
            }
        }
        if options.collection.is_some() && !is_message {
            return Err(invalid("collection settings require a record-typed field"));
        }

        match options.role {
            None => {}
            Some(FieldRole::Id) => {
                if field.repeated || field.kind != FieldKind::Scalar(ScalarKind::String) {
                    return Err(invalid("ID must be a singular string field"));
                }
                claim(&mut indexes.id, index, || invalid("more than one ID field"))?;
            }
            Some(role) => {
                if field.repeated || !is_message {
                    return Err(invalid(
                        "KEY, PARENT and REFERENCE require a singular record-typed field",
                    ));
                }
                match role {
                    FieldRole::Key => {
                        if let FieldKind::Message(key_type) = &field.kind {
                            if key_type.id_field().is_none() {
                                return Err(SchemaResolutionError::MissingKeyId {
                                    record: record.to_string(),
                                    field: field.name.clone(),
                                    key_type: key_type.name().to_string(),
                                });
                            }
                        }
                        claim(&mut indexes.key, index, || invalid("more than one KEY field"))?;
                    }
                    FieldRole::Parent => {
                        claim(&mut indexes.parent, index, || {
                            invalid("more than one PARENT field")
                        })?;
                    }
                    _ => {}
                }
            }
        }
    }

    Ok(indexes)
}

fn claim(
    slot: &mut Option<usize>,
    index: usize,
    err: impl FnOnce() -> SchemaResolutionError,
) -> Result<(), SchemaResolutionError> {
    if slot.is_some() {
        return Err(err());
    }
    *slot = Some(index);
    Ok(())
}
