//! Shared types, error definitions, and constants for the ingestion service.
//!
//! This crate provides the foundational types used across all ingest crates:
//! the event/reading domain model, the service-wide error type (via
//! `thiserror`) with its status-code classification, and the request-scoped
//! context threaded through every layer.
//!
//! No crate in the workspace depends on anything *except* `ingest-types` for
//! cross-cutting type definitions. This keeps the dependency graph clean and
//! prevents circular dependencies.

mod context;
mod error;

pub use context::RequestContext;
pub use error::{ErrorKind, ServiceError};

use std::collections::BTreeMap;

/// Version tag carried by every request and response body.
pub const API_VERSION: &str = "v2";

/// Declared type of a reading's value.
///
/// The wire names match the variant names exactly (`"Int32"`, `"Float64"`,
/// ...). Parsing is case-sensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// `true` / `false`.
    Bool,
    /// Free-form UTF-8 text.
    String,
    /// Unsigned 8-bit integer.
    Uint8,
    /// Unsigned 16-bit integer.
    Uint16,
    /// Unsigned 32-bit integer.
    Uint32,
    /// Unsigned 64-bit integer.
    Uint64,
    /// Signed 8-bit integer.
    Int8,
    /// Signed 16-bit integer.
    Int16,
    /// Signed 32-bit integer.
    Int32,
    /// Signed 64-bit integer.
    Int64,
    /// Single-precision float.
    Float32,
    /// Double-precision float.
    Float64,
    /// Opaque bytes, carried in `binary_value` with a media type.
    Binary,
}

impl ValueType {
    /// Returns the canonical wire label for this value type.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bool => "Bool",
            Self::String => "String",
            Self::Uint8 => "Uint8",
            Self::Uint16 => "Uint16",
            Self::Uint32 => "Uint32",
            Self::Uint64 => "Uint64",
            Self::Int8 => "Int8",
            Self::Int16 => "Int16",
            Self::Int32 => "Int32",
            Self::Int64 => "Int64",
            Self::Float32 => "Float32",
            Self::Float64 => "Float64",
            Self::Binary => "Binary",
        }
    }

    /// Checks whether `value` is a valid textual encoding for this type.
    ///
    /// `Binary` and `String` accept anything; the binary payload is checked
    /// separately.
    pub fn accepts(self, value: &str) -> bool {
        match self {
            Self::Bool => value.parse::<bool>().is_ok(),
            Self::String | Self::Binary => true,
            Self::Uint8 => value.parse::<u8>().is_ok(),
            Self::Uint16 => value.parse::<u16>().is_ok(),
            Self::Uint32 => value.parse::<u32>().is_ok(),
            Self::Uint64 => value.parse::<u64>().is_ok(),
            Self::Int8 => value.parse::<i8>().is_ok(),
            Self::Int16 => value.parse::<i16>().is_ok(),
            Self::Int32 => value.parse::<i32>().is_ok(),
            Self::Int64 => value.parse::<i64>().is_ok(),
            Self::Float32 => value.parse::<f32>().is_ok(),
            Self::Float64 => value.parse::<f64>().is_ok(),
        }
    }
}

impl std::fmt::Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ValueType {
    type Err = ParseValueTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Bool" => Ok(Self::Bool),
            "String" => Ok(Self::String),
            "Uint8" => Ok(Self::Uint8),
            "Uint16" => Ok(Self::Uint16),
            "Uint32" => Ok(Self::Uint32),
            "Uint64" => Ok(Self::Uint64),
            "Int8" => Ok(Self::Int8),
            "Int16" => Ok(Self::Int16),
            "Int32" => Ok(Self::Int32),
            "Int64" => Ok(Self::Int64),
            "Float32" => Ok(Self::Float32),
            "Float64" => Ok(Self::Float64),
            "Binary" => Ok(Self::Binary),
            _ => Err(ParseValueTypeError(s.to_string())),
        }
    }
}

/// Error returned when parsing an unknown value type string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown value type: {0}")]
pub struct ParseValueTypeError(pub String);

/// A single sensor reading carried by an [`Event`].
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    /// Store-assigned identifier (empty until persisted).
    pub id: String,
    /// Origin timestamp in nanoseconds since the Unix epoch.
    pub origin: i64,
    /// Device that produced the reading.
    pub device_name: String,
    /// Resource (sensor channel) the reading belongs to.
    pub resource_name: String,
    /// Device profile that describes the resource.
    pub profile_name: String,
    /// Declared type of `value`.
    pub value_type: ValueType,
    /// Textual value; empty for binary readings.
    pub value: String,
    /// Raw payload for [`ValueType::Binary`] readings.
    pub binary_value: Option<Vec<u8>>,
    /// MIME type of `binary_value`.
    pub media_type: String,
    /// Engineering units, if any.
    pub units: String,
}

/// A telemetry event: a timestamped group of readings from one source.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Identifier; empty means "let the store assign one".
    pub id: String,
    /// Device that produced the event.
    pub device_name: String,
    /// Device profile the event conforms to.
    pub profile_name: String,
    /// Command or resource that triggered the event.
    pub source_name: String,
    /// Origin timestamp in nanoseconds since the Unix epoch.
    pub origin: i64,
    /// Readings in the order the client submitted them.
    pub readings: Vec<Reading>,
    /// Free-form labels attached by the producer.
    pub tags: BTreeMap<String, String>,
}
