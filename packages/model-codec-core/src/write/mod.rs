//! Logical write operations produced by collapsing a record tree.

mod proxy;

pub use proxy::{InMemoryWriteProxy, WriteProxy};

use crate::error::WriteError;
use crate::record::Record;
use crate::schema::CollectionMode;
use crate::value::ValueMap;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Execution strategy for a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteDisposition {
    /// Unconditional overwrite
    #[default]
    Blind,
    /// Fails if the document exists
    Create,
    /// Fails if the document is missing
    Update,
}

impl FromStr for WriteDisposition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "blind" => Ok(WriteDisposition::Blind),
            "create" => Ok(WriteDisposition::Create),
            "update" => Ok(WriteDisposition::Update),
            other => Err(format!("unknown write disposition '{}'", other)),
        }
    }
}

/// One document write.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WriteOperation {
    pub path: String,
    pub disposition: WriteDisposition,
    pub mode: CollectionMode,
    /// Index of the governing operation within the same [`CollapsedMessage`]
    pub parent: Option<usize>,
    /// Field of the parent record this write was collapsed from
    pub field: Option<String>,
    pub data: ValueMap,
}

/// Marker for the parent of a collapsed record; performs no write.
#[derive(Debug, Clone, PartialEq)]
pub struct ParentOperation {
    pub path: String,
    pub record: Record,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Parent(ParentOperation),
    Write(WriteOperation),
}

impl Operation {
    pub fn path(&self) -> &str {
        match self {
            Operation::Parent(parent) => &parent.path,
            Operation::Write(write) => &write.path,
        }
    }

    pub fn parent(&self) -> Option<usize> {
        match self {
            Operation::Parent(_) => None,
            Operation::Write(write) => write.parent,
        }
    }

    pub fn as_write(&self) -> Option<&WriteOperation> {
        match self {
            Operation::Write(write) => Some(write),
            Operation::Parent(_) => None,
        }
    }
}

/// Ordered operations for one record tree: parent marker (if any), root, then
/// descendants depth-first.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CollapsedMessage {
    operations: Vec<Operation>,
}

impl CollapsedMessage {
    pub(crate) fn new(operations: Vec<Operation>) -> Self {
        Self { operations }
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn into_operations(self) -> Vec<Operation> {
        self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// The top-level record's write.
    pub fn root(&self) -> Option<&WriteOperation> {
        self.writes().next()
    }

    pub fn writes(&self) -> impl Iterator<Item = &WriteOperation> {
        self.operations.iter().filter_map(Operation::as_write)
    }

    pub fn parent_of(&self, operation: &Operation) -> Option<&Operation> {
        operation
            .parent()
            .and_then(|index| self.operations.get(index))
    }

    /// Executes every write against `proxy`, in order. Parent markers are skipped.
    ///
    /// # Returns
    /// References of the written documents, or the first write error.
    pub fn persist<P: WriteProxy>(
        &self,
        prefix: Option<&str>,
        proxy: &P,
    ) -> Result<Vec<P::Ref>, WriteError> {
        let mut written = Vec::with_capacity(self.operations.len());
        for write in self.writes() {
            let reference = proxy.reference(&write.path, prefix);
            match write.disposition {
                WriteDisposition::Blind => proxy.put(&reference, &write.data)?,
                WriteDisposition::Create => proxy.create(&reference, &write.data)?,
                WriteDisposition::Update => proxy.update(&reference, &write.data)?,
            }
            tracing::debug!(
                path = %write.path,
                disposition = ?write.disposition,
                "persisted write"
            );
            written.push(reference);
        }
        Ok(written)
    }
}
