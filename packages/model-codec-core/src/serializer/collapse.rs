//! Flattening a record tree into ordered write operations.

use super::identity::{collection_path, record_path, resolve_id};
use super::{check_base, is_deferred, ObjectModelSerializer, SerializeScope};
use crate::error::{Result, SerializationError};
use crate::record::{FieldData, NativeValue, Record};
use crate::schema::{CollectionMode, FieldDescriptor, RecordDescriptor};
use crate::value::Value;
use crate::write::{
    CollapsedMessage, Operation, ParentOperation, WriteDisposition, WriteOperation,
};

/// Position of a record within the tree being collapsed.
#[derive(Clone, Copy)]
struct WriteContext<'a> {
    /// Field of the parent record holding this one; `None` for the root
    field: Option<&'a FieldDescriptor>,
    /// Index of the governing operation
    parent: Option<usize>,
    in_collection: bool,
    concrete: Option<&'a str>,
}

impl ObjectModelSerializer {
    /// Collapses a record and its deferred sub-records into write operations.
    ///
    /// # Arguments
    /// * `record` - Root record; must resolve an ID
    /// * `base` - Previous state of the root, for default elision
    /// * `parent` - Record the root is stored under; emitted as a parent marker
    /// * `disposition` - Applied to every write
    ///
    /// # Returns
    /// Operations in order: parent marker, root write, then descendants depth-first.
    pub fn collapse(
        &self,
        record: &Record,
        base: Option<&Record>,
        parent: Option<&Record>,
        disposition: WriteDisposition,
    ) -> Result<CollapsedMessage> {
        let mut operations = Vec::new();
        let parent_index = match parent {
            Some(parent) => {
                resolve_id(parent).map_err(|_| SerializationError::MissingParentId {
                    record: parent.type_name().to_string(),
                })?;
                operations.push(Operation::Parent(ParentOperation {
                    path: record_path(parent)?,
                    record: parent.clone(),
                }));
                Some(0)
            }
            None => None,
        };

        let root = WriteContext {
            field: None,
            parent: parent_index,
            in_collection: false,
            concrete: None,
        };
        self.collapse_into(record, base, root, disposition, &mut operations)?;
        tracing::debug!(
            record = record.type_name(),
            operations = operations.len(),
            "collapsed record"
        );
        Ok(CollapsedMessage::new(operations))
    }

    fn collapse_into(
        &self,
        record: &Record,
        base: Option<&Record>,
        ctx: WriteContext<'_>,
        disposition: WriteDisposition,
        operations: &mut Vec<Operation>,
    ) -> Result<()> {
        check_base(record, base)?;
        let descriptor = record.descriptor();
        let id = resolve_id(record)?;

        let scope = SerializeScope {
            skip_collections: true,
            in_collection: ctx.in_collection,
            concrete: ctx.concrete,
        };
        let mut data = self.serialize(record, base, scope)?;

        let prefix = ctx
            .parent
            .and_then(|index| operations.get(index))
            .map(|operation| format!("{}/", operation.path()))
            .unwrap_or_default();
        let path = format!("{}{}/{}", prefix, write_segment(descriptor, ctx.field)?, id);
        let mode = match ctx.field {
            Some(field) => field.declared_mode().unwrap_or(CollectionMode::Nested),
            None => descriptor
                .storage()
                .and_then(|storage| storage.mode)
                .unwrap_or(CollectionMode::Group),
        };

        let mut children = Vec::new();
        for (index, field) in descriptor.fields().iter().enumerate() {
            if field.options.ephemeral || !is_deferred(field) {
                continue;
            }
            let Some(current) = record.get_at(index) else {
                continue;
            };
            let unchanged = base.and_then(|base| base.get_at(index)) == Some(current);
            if unchanged && !self.config.include_defaults {
                continue;
            }
            match current {
                FieldData::Repeated(items) => {
                    for item in items {
                        match item {
                            NativeValue::Record(sub) => children.push((field, sub, true)),
                            other => self.skipped(record, field, other),
                        }
                    }
                }
                FieldData::Single(NativeValue::Record(sub)) => {
                    if field.declared_mode() == Some(CollectionMode::Collection) {
                        children.push((field, sub, false));
                    } else {
                        data.insert(field.name.clone(), Value::Map(self.deflate(sub)?));
                    }
                }
                FieldData::Single(other) => self.skipped(record, field, other),
            }
        }

        let own = operations.len();
        operations.push(Operation::Write(WriteOperation {
            path,
            disposition,
            mode,
            parent: ctx.parent,
            field: ctx.field.map(|field| field.name.clone()),
            data,
        }));

        for (field, sub, in_collection) in children {
            let concrete = if in_collection {
                field
                    .options
                    .collection
                    .as_ref()
                    .and_then(|settings| settings.concrete.as_deref())
            } else {
                None
            };
            let child = WriteContext {
                field: Some(field),
                parent: Some(own),
                in_collection,
                concrete,
            };
            self.collapse_into(sub, None, child, disposition, operations)?;
        }
        Ok(())
    }
}

/// Path segment for a write: the root's collection path, or for children the
/// field's collection path, the child type's storage path, then the field name.
fn write_segment(
    descriptor: &RecordDescriptor,
    field: Option<&FieldDescriptor>,
) -> std::result::Result<String, SerializationError> {
    let Some(field) = field else {
        return collection_path(descriptor);
    };
    let declared = field
        .options
        .collection
        .as_ref()
        .and_then(|settings| settings.path.as_deref())
        .filter(|path| !path.trim().is_empty())
        .or_else(|| {
            descriptor
                .storage()
                .and_then(|storage| storage.path.as_deref())
                .filter(|path| !path.trim().is_empty())
        });
    Ok(match declared {
        Some(path) => path.trim_matches('/').to_string(),
        None => field.name.clone(),
    })
}
