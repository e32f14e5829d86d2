//! Error types for AMF decoding
//!
//! Every error is fatal to the current decode: the decoder propagates it to
//! the caller without partial results, and the next call starts from a
//! clean slate.

use std::fmt;

/// Result type alias using the library's error type
pub type Result<T> = std::result::Result<T, DecodeError>;

/// Which AMF dialect a marker belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Amf0,
    Amf3,
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::Amf0 => write!(f, "AMF0"),
            Dialect::Amf3 => write!(f, "AMF3"),
        }
    }
}

/// Which reference table an out-of-range index targeted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Amf0Objects,
    Amf3Strings,
    Amf3Objects,
    Amf3Classes,
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableKind::Amf0Objects => write!(f, "AMF0 object table"),
            TableKind::Amf3Strings => write!(f, "AMF3 string table"),
            TableKind::Amf3Objects => write!(f, "AMF3 object table"),
            TableKind::Amf3Classes => write!(f, "AMF3 class table"),
        }
    }
}

/// AMF decoding errors
#[derive(Debug)]
pub enum DecodeError {
    /// Read past the end of the input buffer
    UnexpectedEof,
    /// Unrecognized type tag
    UnknownMarker { dialect: Dialect, marker: u8 },
    /// Recognized type tag that is deliberately unimplemented
    UnsupportedType { dialect: Dialect, name: &'static str },
    /// AMF3 modified-UTF-8 violation at the given byte offset within the
    /// string payload
    MalformedUtf8 { offset: usize },
    /// AMF3 array with a non-empty string key
    AssociativeArray,
    /// Externalizable class with no registered handler; `raw` is the full
    /// input buffer as hex
    UnknownExternalizable { class_name: String, raw: String },
    /// The envelope did not consume the full buffer; `raw` is the full
    /// input buffer as hex
    TrailingBytes { position: usize, length: usize, raw: String },
    /// Back-reference to an index at or beyond the table's current size
    ReferenceOutOfRange { table: TableKind, index: usize },
    /// A reference or externalizable field resolved to a value of the
    /// wrong shape
    UnexpectedValue { expected: &'static str },
    /// UUID source byte array was not exactly 16 bytes
    InvalidUuid { length: usize },
    /// Container nesting exceeded the configured depth limit
    NestingTooDeep,
    /// JSON-wrapped externalizable payload failed to parse
    Json(serde_json::Error),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::UnexpectedEof => write!(f, "Unexpected end of AMF data"),
            DecodeError::UnknownMarker { dialect, marker } => {
                write!(f, "Unknown {} marker: 0x{:02x}", dialect, marker)
            }
            DecodeError::UnsupportedType { dialect, name } => {
                write!(f, "{} type {} is not supported", dialect, name)
            }
            DecodeError::MalformedUtf8 { offset } => {
                write!(f, "Malformed UTF-8 input around byte {}", offset)
            }
            DecodeError::AssociativeArray => {
                write!(f, "Associative arrays are not supported")
            }
            DecodeError::UnknownExternalizable { class_name, raw } => {
                write!(f, "Unhandled externalizable: {} (raw: {})", class_name, raw)
            }
            DecodeError::TrailingBytes { position, length, raw } => {
                write!(
                    f,
                    "The buffer has not been fully consumed: {} of {} (raw: {})",
                    position, length, raw
                )
            }
            DecodeError::ReferenceOutOfRange { table, index } => {
                write!(f, "Reference into {} out of range: {}", table, index)
            }
            DecodeError::UnexpectedValue { expected } => {
                write!(f, "Expected {} value", expected)
            }
            DecodeError::InvalidUuid { length } => {
                write!(f, "UUID source must be 16 bytes, got {}", length)
            }
            DecodeError::NestingTooDeep => write!(f, "AMF nesting too deep"),
            DecodeError::Json(e) => write!(f, "Invalid JSON payload: {}", e),
        }
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DecodeError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for DecodeError {
    fn from(err: serde_json::Error) -> Self {
        DecodeError::Json(err)
    }
}
