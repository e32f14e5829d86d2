//! amf-rs: AMF0/AMF3 decoder for RTMP invocation responses
//!
//! This library decodes Action Message Format payloads as delivered by the
//! RTMP messaging stack: an invocation response is an optional version
//! byte followed by four AMF0 values (`result`, `invokeId`, `serviceCall`,
//! `data`), any of which may switch to AMF3 via the avmplus marker. The
//! whole buffer must be consumed, or the decode fails.
//!
//! Supported beyond the plain marker sets:
//! - AMF3 reference tables for strings, objects and class traits,
//!   including objects that reference themselves or an ancestor
//! - Modified UTF-8 (Java-style) AMF3 strings: surrogate halves encoded
//!   as two 3-byte sequences are recombined, 4-byte sequences rejected
//! - The Flex externalizable classes `DSA`, `DSK` and
//!   `flex.messaging.io.ArrayCollection`, plus a set of platform
//!   notification classes carried as length-prefixed JSON
//!
//! # Example
//!
//! ```
//! use amf_rs::{decode, AmfValue};
//!
//! // version byte, null result, invokeId 1.0, null serviceCall and data
//! let payload = [
//!     0x00, 0x05, 0x00, 0x3F, 0xF0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
//!     0x05, 0x05,
//! ];
//! let envelope = decode(&payload)?;
//! assert_eq!(envelope.get("invokeId"), Some(&AmfValue::Number(1.0)));
//! # Ok::<(), amf_rs::DecodeError>(())
//! ```

mod cursor;
pub mod decoder;
pub mod error;
pub mod value;

// Re-export main types for convenience
pub use decoder::{decode, AmfDecoder};
pub use error::{DecodeError, Dialect, Result, TableKind};
pub use value::{
    AmfValue, ArrayHandle, ClassDefinition, ObjectHandle, TypedObject, UNDEFINED_TOKEN,
};
