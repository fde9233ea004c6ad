//! Object-model codec for document-store persistence.
//!
//! Maps schema-typed records to sorted generic maps and back, resolves
//! references and parent chains into storage paths, and collapses record trees
//! into ordered write operations.

pub mod codec;
pub mod config;
pub mod deserializer;
pub mod diagnostics;
pub mod error;
pub mod record;
pub mod schema;
pub mod serializer;
pub mod value;
pub mod write;

pub use codec::{CollapsedMessageSerializer, ModelDeserializer, ModelSerializer, ObjectModelCodec};
pub use config::CodecConfig;
pub use deserializer::ObjectModelDeserializer;
pub use error::{CodecError, Result};
pub use record::{NativeValue, Record, Timestamp};
pub use serializer::{ObjectModelSerializer, SerializeScope};
pub use value::{Value, ValueMap};
pub use write::{CollapsedMessage, WriteDisposition};
