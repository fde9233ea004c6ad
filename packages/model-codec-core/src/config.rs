//! Codec configuration.
//!
//! Supports TOML config files, environment variable overrides, and defaults.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::str::FromStr;

/// How enum values are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnumMode {
    /// Enum value name as a string
    #[default]
    Name,
    /// Declared enum number as an integer
    Numeric,
}

impl FromStr for EnumMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "name" => Ok(EnumMode::Name),
            "numeric" | "number" => Ok(EnumMode::Numeric),
            _ => Err(()),
        }
    }
}

/// How timestamps are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstantMode {
    /// Structured `{seconds, nanos}` timestamp value
    #[default]
    Timestamp,
    /// RFC 3339 / ISO-8601 string
    Iso8601,
}

impl FromStr for InstantMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "timestamp" => Ok(InstantMode::Timestamp),
            "iso8601" | "iso-8601" => Ok(InstantMode::Iso8601),
            _ => Err(()),
        }
    }
}

/// Settings shared by the serializer and deserializer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Write fields that hold their default value (default: false)
    pub include_defaults: bool,
    /// Write absent fields as explicit nulls (default: false)
    pub include_nulls: bool,
    /// Write empty repeated fields as null instead of `[]` (default: true)
    pub empty_lists_as_nulls: bool,
    /// Enum encoding (default: name)
    pub enum_mode: EnumMode,
    /// Timestamp encoding (default: timestamp)
    pub instant_mode: InstantMode,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            include_defaults: false,
            include_nulls: false,
            empty_lists_as_nulls: true,
            enum_mode: EnumMode::Name,
            instant_mode: InstantMode::Timestamp,
        }
    }
}

impl CodecConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Applies environment variable overrides.
    /// Environment variables are prefixed with `MODEL_CODEC_`.
    /// Example: `MODEL_CODEC_ENUM_MODE=numeric` overrides `enum_mode`.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(val) = override_var("MODEL_CODEC_INCLUDE_DEFAULTS")? {
            self.include_defaults = val;
        }
        if let Some(val) = override_var("MODEL_CODEC_INCLUDE_NULLS")? {
            self.include_nulls = val;
        }
        if let Some(val) = override_var("MODEL_CODEC_EMPTY_LISTS_AS_NULLS")? {
            self.empty_lists_as_nulls = val;
        }
        if let Some(val) = override_var("MODEL_CODEC_ENUM_MODE")? {
            self.enum_mode = val;
        }
        if let Some(val) = override_var("MODEL_CODEC_INSTANT_MODE")? {
            self.instant_mode = val;
        }
        Ok(())
    }
}

fn override_var<T: FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(name) {
        Ok(val) => val
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidOverride { name, value: val }),
        Err(_) => Ok(None),
    }
}
