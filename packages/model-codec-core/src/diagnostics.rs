//! Soft-failure reporting.
//!
//! Conditions that do not abort a codec call are handed to a [`DiagnosticSink`]
//! supplied at construction time. [`TracingSink`] forwards them to `tracing`;
//! [`MemorySink`] keeps them for inspection.

use std::fmt;
use std::sync::{Arc, Mutex};

/// A recoverable condition observed while encoding or decoding.
#[derive(Debug, Clone, PartialEq)]
pub enum CodecWarning {
    /// Float or double input could not be parsed and was stored as-is
    PrecisionFallback {
        record: String,
        field: String,
        value: String,
    },
    /// Field value skipped because it does not match the declared kind
    SkippedValue {
        record: String,
        field: String,
        reason: String,
    },
    /// Instant could not be converted through the calendar representation
    InstantConversion {
        record: String,
        field: String,
        reason: String,
    },
}

impl CodecWarning {
    pub fn record(&self) -> &str {
        match self {
            CodecWarning::PrecisionFallback { record, .. }
            | CodecWarning::SkippedValue { record, .. }
            | CodecWarning::InstantConversion { record, .. } => record,
        }
    }

    pub fn field(&self) -> &str {
        match self {
            CodecWarning::PrecisionFallback { field, .. }
            | CodecWarning::SkippedValue { field, .. }
            | CodecWarning::InstantConversion { field, .. } => field,
        }
    }
}

impl fmt::Display for CodecWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecWarning::PrecisionFallback { value, .. } => write!(
                f,
                "Unable to parse numeric value '{}'; storing raw value",
                value
            ),
            CodecWarning::SkippedValue { reason, .. } => {
                write!(f, "Skipped field value: {}", reason)
            }
            CodecWarning::InstantConversion { reason, .. } => {
                write!(f, "Unable to convert timestamp for serialization: {}", reason)
            }
        }
    }
}

/// Receiver for codec warnings.
pub trait DiagnosticSink: Send + Sync {
    fn warn(&self, warning: CodecWarning);
}

/// Forwards warnings to `tracing::warn!`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn warn(&self, warning: CodecWarning) {
        tracing::warn!(
            record = warning.record(),
            field = warning.field(),
            "{}",
            warning
        );
    }
}

/// Collects warnings in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    warnings: Mutex<Vec<CodecWarning>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every warning received so far.
    pub fn warnings(&self) -> Vec<CodecWarning> {
        match self.warnings.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.warnings().is_empty()
    }
}

impl DiagnosticSink for MemorySink {
    fn warn(&self, warning: CodecWarning) {
        match self.warnings.lock() {
            Ok(mut guard) => guard.push(warning),
            Err(poisoned) => poisoned.into_inner().push(warning),
        }
    }
}

/// Shared handle to a sink.
pub type SharedSink = Arc<dyn DiagnosticSink>;

pub(crate) fn default_sink() -> SharedSink {
    Arc::new(TracingSink)
}
