//! Codec facade bundling a serializer and deserializer for one record type.

use crate::config::CodecConfig;
use crate::deserializer::ObjectModelDeserializer;
use crate::diagnostics::{default_sink, SharedSink};
use crate::error::{Result, SerializationError};
use crate::record::Record;
use crate::schema::RecordDescriptor;
use crate::serializer::ObjectModelSerializer;
use crate::value::ValueMap;
use crate::write::{CollapsedMessage, WriteDisposition};
use std::sync::Arc;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Converts a record into a generic map.
pub trait ModelSerializer {
    fn deflate(&self, record: &Record) -> Result<ValueMap>;
}

/// Converts a generic map into a record.
pub trait ModelDeserializer {
    fn inflate(&self, data: &ValueMap) -> Result<Record>;
}

/// Converts a record tree into ordered write operations.
pub trait CollapsedMessageSerializer {
    fn collapse(
        &self,
        record: &Record,
        base: Option<&Record>,
        parent: Option<&Record>,
        disposition: WriteDisposition,
    ) -> Result<CollapsedMessage>;
}

impl ModelSerializer for ObjectModelSerializer {
    fn deflate(&self, record: &Record) -> Result<ValueMap> {
        ObjectModelSerializer::deflate(self, record)
    }
}

impl CollapsedMessageSerializer for ObjectModelSerializer {
    fn collapse(
        &self,
        record: &Record,
        base: Option<&Record>,
        parent: Option<&Record>,
        disposition: WriteDisposition,
    ) -> Result<CollapsedMessage> {
        ObjectModelSerializer::collapse(self, record, base, parent, disposition)
    }
}

impl ModelDeserializer for ObjectModelDeserializer {
    fn inflate(&self, data: &ValueMap) -> Result<Record> {
        ObjectModelDeserializer::inflate(self, data)
    }
}

/// Serializer and deserializer for a single record type.
///
/// Records of any other type are rejected with
/// [`SerializationError::ForeignKind`].
#[derive(Debug)]
pub struct ObjectModelCodec {
    descriptor: Arc<RecordDescriptor>,
    serializer: ObjectModelSerializer,
    deserializer: ObjectModelDeserializer,
}

impl ObjectModelCodec {
    /// Codec with the default configuration, logging warnings through `tracing`.
    pub fn for_model(descriptor: &Arc<RecordDescriptor>) -> Self {
        Self::with_settings(descriptor, CodecConfig::default(), default_sink())
    }

    pub fn with_settings(
        descriptor: &Arc<RecordDescriptor>,
        config: CodecConfig,
        diagnostics: SharedSink,
    ) -> Self {
        Self {
            descriptor: Arc::clone(descriptor),
            serializer: ObjectModelSerializer::with_diagnostics(config, Arc::clone(&diagnostics)),
            deserializer: ObjectModelDeserializer::with_diagnostics(descriptor, diagnostics),
        }
    }

    pub fn descriptor(&self) -> &Arc<RecordDescriptor> {
        &self.descriptor
    }

    pub fn serializer(&self) -> &ObjectModelSerializer {
        &self.serializer
    }

    pub fn deserializer(&self) -> &ObjectModelDeserializer {
        &self.deserializer
    }

    pub fn deflate(&self, record: &Record) -> Result<ValueMap> {
        self.check_kind(record)?;
        self.serializer.deflate(record)
    }

    pub fn inflate(&self, data: &ValueMap) -> Result<Record> {
        self.deserializer.inflate(data)
    }

    pub fn collapse(
        &self,
        record: &Record,
        base: Option<&Record>,
        parent: Option<&Record>,
        disposition: WriteDisposition,
    ) -> Result<CollapsedMessage> {
        self.check_kind(record)?;
        self.serializer.collapse(record, base, parent, disposition)
    }

    /// Deflates every record, stopping at the first error.
    ///
    /// # Returns
    /// Maps in input order.
    pub fn deflate_batch(&self, records: &[Record]) -> Result<Vec<ValueMap>> {
        #[cfg(feature = "parallel")]
        {
            records.par_iter().map(|record| self.deflate(record)).collect()
        }
        #[cfg(not(feature = "parallel"))]
        {
            records.iter().map(|record| self.deflate(record)).collect()
        }
    }

    /// Collapses every record with the same disposition and no base or parent.
    pub fn collapse_batch(
        &self,
        records: &[Record],
        disposition: WriteDisposition,
    ) -> Result<Vec<CollapsedMessage>> {
        #[cfg(feature = "parallel")]
        {
            records
                .par_iter()
                .map(|record| self.collapse(record, None, None, disposition))
                .collect()
        }
        #[cfg(not(feature = "parallel"))]
        {
            records
                .iter()
                .map(|record| self.collapse(record, None, None, disposition))
                .collect()
        }
    }

    fn check_kind(&self, record: &Record) -> Result<()> {
        if record.type_name() != self.descriptor.name() {
            return Err(SerializationError::ForeignKind {
                expected: self.descriptor.name().to_string(),
                actual: record.type_name().to_string(),
            }
            .into());
        }
        Ok(())
    }
}

impl ModelSerializer for ObjectModelCodec {
    fn deflate(&self, record: &Record) -> Result<ValueMap> {
        ObjectModelCodec::deflate(self, record)
    }
}

impl ModelDeserializer for ObjectModelCodec {
    fn inflate(&self, data: &ValueMap) -> Result<Record> {
        ObjectModelCodec::inflate(self, data)
    }
}

impl CollapsedMessageSerializer for ObjectModelCodec {
    fn collapse(
        &self,
        record: &Record,
        base: Option<&Record>,
        parent: Option<&Record>,
        disposition: WriteDisposition,
    ) -> Result<CollapsedMessage> {
        ObjectModelCodec::collapse(self, record, base, parent, disposition)
    }
}
