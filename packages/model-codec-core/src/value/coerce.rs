//! Conversion between [`NativeValue`]s and wire [`Value`]s.

use super::Value;
use crate::config::{EnumMode, InstantMode};
use crate::record::{NativeValue, Timestamp};
use crate::schema::{EnumDescriptor, FieldKind, ScalarKind};
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;

/// Coercion failure, without field context.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoercionError {
    #[error("expected {expected}, found {found}")]
    WrongKind {
        expected: String,
        found: &'static str,
    },

    #[error("unresolvable enum value '{0}'")]
    UnresolvedEnum(String),

    #[error("invalid base64: {0}")]
    InvalidBytes(String),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("value {0} out of range")]
    OutOfRange(String),
}

/// Result of decoding a wire value.
#[derive(Debug, Clone, PartialEq)]
pub enum Coerced {
    /// Value decoded to the declared kind
    Exact(NativeValue),
    /// Floating-point input that could not be parsed, passed through as-is
    Fallback(NativeValue),
}

impl Coerced {
    pub fn into_inner(self) -> NativeValue {
        match self {
            Coerced::Exact(value) | Coerced::Fallback(value) => value,
        }
    }
}

/// Type-directed wrapping and unwrapping of field values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Coercion {
    pub enum_mode: EnumMode,
    pub instant_mode: InstantMode,
}

impl Coercion {
    pub fn new(enum_mode: EnumMode, instant_mode: InstantMode) -> Self {
        Self {
            enum_mode,
            instant_mode,
        }
    }

    /// Wraps a native value for its declared kind.
    ///
    /// Record kinds are not handled here and always fail.
    pub fn wrap(&self, value: &NativeValue, kind: &FieldKind) -> Result<Value, CoercionError> {
        match (kind, value) {
            (FieldKind::Scalar(ScalarKind::Bool), NativeValue::Bool(b)) => Ok(Value::Boolean(*b)),
            (FieldKind::Scalar(scalar), NativeValue::Int(i)) if scalar.is_integral() => {
                Ok(Value::Integer(*i))
            }
            // Unsigned values ride through the signed wire integer.
            (FieldKind::Scalar(scalar), NativeValue::UInt(u)) if scalar.is_integral() => {
                Ok(Value::Integer(*u as i64))
            }
            (FieldKind::Scalar(scalar), NativeValue::Float(f)) if scalar.is_floating() => {
                Ok(Value::Double(f64::from(*f)))
            }
            (FieldKind::Scalar(scalar), NativeValue::Double(d)) if scalar.is_floating() => {
                Ok(Value::Double(*d))
            }
            (FieldKind::Scalar(ScalarKind::String), NativeValue::String(s)) => {
                Ok(Value::String(s.clone()))
            }
            (FieldKind::Scalar(ScalarKind::Bytes), NativeValue::Bytes(bytes)) => {
                Ok(Value::String(STANDARD.encode(bytes)))
            }
            (FieldKind::Enum(descriptor), NativeValue::Enum(number)) => {
                self.wrap_enum(descriptor, *number)
            }
            (FieldKind::Timestamp, NativeValue::Timestamp(timestamp)) => {
                self.wrap_instant(*timestamp)
            }
            (kind, value) => Err(CoercionError::WrongKind {
                expected: kind.type_name().to_string(),
                found: value.kind_name(),
            }),
        }
    }

    fn wrap_enum(&self, descriptor: &EnumDescriptor, number: i32) -> Result<Value, CoercionError> {
        match self.enum_mode {
            EnumMode::Numeric => Ok(Value::Integer(i64::from(number))),
            EnumMode::Name => descriptor
                .find_by_number(number)
                .map(|value| Value::String(value.name.clone()))
                .ok_or_else(|| CoercionError::UnresolvedEnum(number.to_string())),
        }
    }

    fn wrap_instant(&self, timestamp: Timestamp) -> Result<Value, CoercionError> {
        match self.instant_mode {
            InstantMode::Timestamp if timestamp.seconds > 0 => Ok(Value::Timestamp(timestamp)),
            InstantMode::Timestamp => {
                let instant = to_datetime(timestamp)?;
                Ok(Value::Timestamp(Timestamp::from_millis(
                    instant.timestamp_millis(),
                )))
            }
            InstantMode::Iso8601 => {
                let instant = to_datetime(timestamp)?;
                Ok(Value::String(
                    instant.to_rfc3339_opts(SecondsFormat::AutoSi, true),
                ))
            }
        }
    }

    /// Unwraps a wire value for its declared kind.
    ///
    /// Floating-point kinds never fail on scalar input: anything that does not
    /// parse is returned as [`Coerced::Fallback`] holding the raw value.
    pub fn unwrap(&self, value: &Value, kind: &FieldKind) -> Result<Coerced, CoercionError> {
        let wrong_kind = || CoercionError::WrongKind {
            expected: kind.type_name().to_string(),
            found: value.kind_name(),
        };
        let native = match kind {
            FieldKind::Scalar(ScalarKind::Bool) => match value {
                Value::Boolean(b) => NativeValue::Bool(*b),
                Value::String(s) => NativeValue::Bool(s.trim().parse().map_err(|_| wrong_kind())?),
                _ => return Err(wrong_kind()),
            },
            FieldKind::Scalar(scalar) if scalar.is_floating() => {
                if let Some(coerced) = unwrap_floating(value, *scalar) {
                    return Ok(coerced);
                }
                return raw_native(value)
                    .map(Coerced::Fallback)
                    .ok_or_else(wrong_kind);
            }
            FieldKind::Scalar(scalar) if scalar.is_integral() => {
                unwrap_integral(value, *scalar).ok_or_else(wrong_kind)??
            }
            FieldKind::Scalar(ScalarKind::String) => match value {
                Value::String(s) | Value::Reference(s) => NativeValue::String(s.clone()),
                _ => return Err(wrong_kind()),
            },
            FieldKind::Scalar(ScalarKind::Bytes) => match value {
                Value::Bytes(bytes) => NativeValue::Bytes(bytes.clone()),
                Value::String(text) => NativeValue::Bytes(
                    STANDARD
                        .decode(text.trim())
                        .map_err(|e| CoercionError::InvalidBytes(e.to_string()))?,
                ),
                _ => return Err(wrong_kind()),
            },
            FieldKind::Scalar(_) => return Err(wrong_kind()),
            FieldKind::Enum(descriptor) => NativeValue::Enum(unwrap_enum(value, descriptor)?),
            FieldKind::Timestamp => NativeValue::Timestamp(unwrap_timestamp(value)?),
            FieldKind::Message(_) => return Err(wrong_kind()),
        };
        Ok(Coerced::Exact(native))
    }

    /// Unwraps a repeated enum: a list of names or numbers, or a map keyed by names.
    pub fn unwrap_enum_set(
        &self,
        value: &Value,
        descriptor: &EnumDescriptor,
    ) -> Result<Vec<i32>, CoercionError> {
        match value {
            Value::List(entries) => entries
                .iter()
                .filter(|entry| !entry.is_null())
                .map(|entry| unwrap_enum(entry, descriptor))
                .collect(),
            // Only key presence matters for map-encoded sets.
            Value::Map(map) => map
                .keys()
                .map(|name| {
                    descriptor
                        .find_by_name(&name.to_uppercase())
                        .map(|value| value.number)
                        .ok_or_else(|| CoercionError::UnresolvedEnum(name.clone()))
                })
                .collect(),
            other => Err(CoercionError::WrongKind {
                expected: format!("list or map of {}", descriptor.name()),
                found: other.kind_name(),
            }),
        }
    }
}

fn to_datetime(timestamp: Timestamp) -> Result<DateTime<Utc>, CoercionError> {
    let nanos = u32::try_from(timestamp.nanos).map_err(|_| {
        CoercionError::InvalidTimestamp(format!("negative nanos {}", timestamp.nanos))
    })?;
    DateTime::from_timestamp(timestamp.seconds, nanos).ok_or_else(|| {
        CoercionError::InvalidTimestamp(format!(
            "{}s {}ns is out of range",
            timestamp.seconds, timestamp.nanos
        ))
    })
}

fn unwrap_floating(value: &Value, kind: ScalarKind) -> Option<Coerced> {
    let parsed = match value {
        Value::Double(d) => *d,
        Value::Integer(i) => *i as f64,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    Some(Coerced::Exact(if kind == ScalarKind::Float {
        NativeValue::Float(parsed as f32)
    } else {
        NativeValue::Double(parsed)
    }))
}

/// Raw pass-through for values that failed to parse as a number.
fn raw_native(value: &Value) -> Option<NativeValue> {
    match value {
        Value::Boolean(b) => Some(NativeValue::Bool(*b)),
        Value::String(s) | Value::Reference(s) => Some(NativeValue::String(s.clone())),
        Value::Bytes(bytes) => Some(NativeValue::Bytes(bytes.clone())),
        Value::Timestamp(timestamp) => Some(NativeValue::Timestamp(*timestamp)),
        _ => None,
    }
}

/// `None` when the wire value cannot carry an integer at all.
fn unwrap_integral(value: &Value, kind: ScalarKind) -> Option<Result<NativeValue, CoercionError>> {
    let wide: i128 = match value {
        Value::Integer(i) => i128::from(*i),
        Value::Double(d) if d.is_finite() => d.trunc() as i128,
        Value::String(s) => s.trim().parse::<i128>().ok()?,
        _ => return None,
    };
    Some(narrow(wide, kind))
}

fn narrow(wide: i128, kind: ScalarKind) -> Result<NativeValue, CoercionError> {
    let out_of_range = || CoercionError::OutOfRange(wide.to_string());
    match (kind.is_unsigned(), kind.is_32bit()) {
        (true, true) => u32::try_from(wide)
            .map(|v| NativeValue::UInt(u64::from(v)))
            .map_err(|_| out_of_range()),
        (true, false) => {
            // Negative wire integers are reinterpreted from two's complement.
            if let Ok(v) = u64::try_from(wide) {
                Ok(NativeValue::UInt(v))
            } else {
                i64::try_from(wide)
                    .map(|v| NativeValue::UInt(v as u64))
                    .map_err(|_| out_of_range())
            }
        }
        (false, true) => i32::try_from(wide)
            .map(|v| NativeValue::Int(i64::from(v)))
            .map_err(|_| out_of_range()),
        (false, false) => i64::try_from(wide)
            .map(NativeValue::Int)
            .map_err(|_| out_of_range()),
    }
}

fn unwrap_enum(value: &Value, descriptor: &EnumDescriptor) -> Result<i32, CoercionError> {
    let resolved = match value {
        Value::String(name) => descriptor.find_by_name(name).or_else(|| {
            name.trim()
                .parse::<i32>()
                .ok()
                .and_then(|number| descriptor.find_by_number(number))
        }),
        Value::Integer(number) => i32::try_from(*number)
            .ok()
            .and_then(|number| descriptor.find_by_number(number)),
        Value::Double(number) if number.fract() == 0.0 => descriptor.find_by_number(*number as i32),
        other => {
            return Err(CoercionError::WrongKind {
                expected: descriptor.name().to_string(),
                found: other.kind_name(),
            })
        }
    };
    resolved
        .map(|value| value.number)
        .ok_or_else(|| CoercionError::UnresolvedEnum(display_raw(value)))
}

fn unwrap_timestamp(value: &Value) -> Result<Timestamp, CoercionError> {
    match value {
        Value::Timestamp(timestamp) => Ok(*timestamp),
        Value::String(text) => DateTime::parse_from_rfc3339(text.trim())
            .map(|instant| {
                Timestamp::new(instant.timestamp(), instant.timestamp_subsec_nanos() as i32)
            })
            .map_err(|e| CoercionError::InvalidTimestamp(e.to_string())),
        Value::Integer(seconds) => Ok(Timestamp::new(*seconds, 0)),
        Value::Double(seconds) if seconds.is_finite() => {
            let whole = seconds.floor();
            let nanos = ((seconds - whole) * 1e9).round() as i32;
            Ok(Timestamp::new(whole as i64, nanos.min(999_999_999)))
        }
        Value::Map(map) => {
            let seconds = match map.get("seconds") {
                Some(Value::Integer(seconds)) => *seconds,
                None => 0,
                Some(other) => {
                    return Err(CoercionError::InvalidTimestamp(format!(
                        "seconds must be an integer, found {}",
                        other.kind_name()
                    )))
                }
            };
            let nanos = match map.get("nanos") {
                Some(Value::Integer(nanos)) => i32::try_from(*nanos)
                    .map_err(|_| CoercionError::InvalidTimestamp(format!("nanos {}", nanos)))?,
                None => 0,
                Some(other) => {
                    return Err(CoercionError::InvalidTimestamp(format!(
                        "nanos must be an integer, found {}",
                        other.kind_name()
                    )))
                }
            };
            Ok(Timestamp::new(seconds, nanos))
        }
        other => Err(CoercionError::WrongKind {
            expected: "timestamp".to_string(),
            found: other.kind_name(),
        }),
    }
}

fn display_raw(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Integer(i) => i.to_string(),
        Value::Double(d) => d.to_string(),
        other => other.kind_name().to_string(),
    }
}
