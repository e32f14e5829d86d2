//! AMF invocation-response decoder
//!
//! One [`AmfDecoder`] parses one payload end-to-end: an optional version
//! byte followed by the four-field response tuple (`result`, `invokeId`,
//! `serviceCall`, `data`), each an AMF0 value that may hand off to AMF3 via
//! the avmplus marker (0x11). The buffer must be fully consumed.
//!
//! The decoder keeps four per-decode reference tables (AMF0 objects, AMF3
//! strings, AMF3 objects, AMF3 class traits), all cleared at the top of
//! every [`AmfDecoder::decode`] call. Back-references resolve to strictly
//! earlier insertions; containers are inserted before their bodies are
//! parsed so self-referential cycles resolve to the same shared handle.
//!
//! A decoder instance must not be shared across concurrent decodes: the
//! reference tables are per-decoder mutable state.

mod amf0;
mod amf3;
mod flex;

use bytes::Bytes;

use crate::cursor::ByteCursor;
use crate::error::{DecodeError, Result, TableKind};
use crate::value::{AmfValue, ClassDefinition, TypedObject};

/// Maximum nesting depth for objects/arrays (prevent stack overflow)
const MAX_NESTING_DEPTH: usize = 64;

/// AMF0/AMF3 decoder for RTMP invocation responses
pub struct AmfDecoder {
    cursor: ByteCursor,
    /// Current container nesting depth
    depth: usize,
    max_depth: usize,
    /// AMF0 object reference table
    amf0_objects: Vec<AmfValue>,
    /// AMF3 string reference table; empty strings are never interned
    strings: Vec<String>,
    /// AMF3 object reference table; containers are inserted before their
    /// bodies are decoded
    objects: Vec<AmfValue>,
    /// AMF3 class trait reference table
    classes: Vec<ClassDefinition>,
}

impl AmfDecoder {
    /// Create a decoder with the default nesting limit
    pub fn new() -> Self {
        Self::with_max_depth(MAX_NESTING_DEPTH)
    }

    /// Create a decoder with an explicit nesting limit
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            cursor: ByteCursor::new(Bytes::new()),
            depth: 0,
            max_depth,
            amf0_objects: Vec::new(),
            strings: Vec::new(),
            objects: Vec::new(),
            classes: Vec::new(),
        }
    }

    /// Decode a complete invocation response into a fresh envelope object
    pub fn decode(&mut self, data: &[u8]) -> Result<TypedObject> {
        let mut envelope = TypedObject::anonymous();
        self.decode_into(data, &mut envelope)?;
        Ok(envelope)
    }

    /// Decode a complete invocation response into the given envelope
    ///
    /// Peels an optional leading version byte (0x00, recorded as the
    /// `version` field), then decodes the four AMF0 response fields in
    /// order. Fails with [`DecodeError::TrailingBytes`] unless the buffer
    /// is consumed exactly.
    pub fn decode_into(&mut self, data: &[u8], envelope: &mut TypedObject) -> Result<()> {
        self.reset(Bytes::copy_from_slice(data));
        if self.cursor.peek_u8()? == 0x00 {
            self.cursor.read_u8()?;
            envelope.insert("version", AmfValue::Integer(0));
        }
        envelope.insert("result", self.decode_amf0_value()?);
        envelope.insert("invokeId", self.decode_amf0_value()?);
        envelope.insert("serviceCall", self.decode_amf0_value()?);
        envelope.insert("data", self.decode_amf0_value()?);
        if self.cursor.position() != self.cursor.len() {
            return Err(DecodeError::TrailingBytes {
                position: self.cursor.position(),
                length: self.cursor.len(),
                raw: self.cursor.raw_hex(),
            });
        }
        Ok(())
    }

    /// Point the read head at a new buffer and clear all reference tables
    pub(crate) fn reset(&mut self, data: Bytes) {
        tracing::debug!("clearing references");
        self.cursor = ByteCursor::new(data);
        self.depth = 0;
        self.amf0_objects.clear();
        self.strings.clear();
        self.objects.clear();
        self.classes.clear();
    }

    pub(crate) fn enter_nested(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > self.max_depth {
            self.depth -= 1;
            return Err(DecodeError::NestingTooDeep);
        }
        Ok(())
    }

    pub(crate) fn leave_nested(&mut self) {
        self.depth -= 1;
    }

    // Reference-table operations. Stores happen in strict reading order;
    // fetches beyond the current table size are malformed input.

    pub(crate) fn store_amf0_object(&mut self, value: AmfValue) {
        tracing::debug!(index = self.amf0_objects.len(), value = %value, "store AMF0 object");
        self.amf0_objects.push(value);
    }

    pub(crate) fn stored_amf0_object(&self, index: usize) -> Result<AmfValue> {
        let value = self.amf0_objects.get(index).ok_or(DecodeError::ReferenceOutOfRange {
            table: TableKind::Amf0Objects,
            index,
        })?;
        tracing::debug!(index, value = %value, "get AMF0 reference");
        Ok(value.clone())
    }

    pub(crate) fn store_amf3_object(&mut self, value: AmfValue) {
        tracing::debug!(index = self.objects.len(), value = %value, "store AMF3 object");
        self.objects.push(value);
    }

    pub(crate) fn stored_amf3_object(&self, index: usize) -> Result<AmfValue> {
        let value = self.objects.get(index).ok_or(DecodeError::ReferenceOutOfRange {
            table: TableKind::Amf3Objects,
            index,
        })?;
        tracing::debug!(index, value = %value, "get AMF3 object");
        Ok(value.clone())
    }

    pub(crate) fn store_amf3_string(&mut self, string: String) {
        tracing::debug!(index = self.strings.len(), value = %string, "store AMF3 string");
        self.strings.push(string);
    }

    pub(crate) fn stored_amf3_string(&self, index: usize) -> Result<String> {
        let string = self.strings.get(index).ok_or(DecodeError::ReferenceOutOfRange {
            table: TableKind::Amf3Strings,
            index,
        })?;
        tracing::debug!(index, value = %string, "get AMF3 string");
        Ok(string.clone())
    }

    pub(crate) fn store_amf3_class(&mut self, definition: ClassDefinition) {
        tracing::debug!(index = self.classes.len(), class = %definition.class_name, "store AMF3 class definition");
        self.classes.push(definition);
    }

    pub(crate) fn stored_amf3_class(&self, index: usize) -> Result<ClassDefinition> {
        let definition = self.classes.get(index).ok_or(DecodeError::ReferenceOutOfRange {
            table: TableKind::Amf3Classes,
            index,
        })?;
        tracing::debug!(index, class = %definition.class_name, "get AMF3 class definition");
        Ok(definition.clone())
    }

    #[cfg(test)]
    pub(crate) fn string_table_len(&self) -> usize {
        self.strings.len()
    }
}

impl Default for AmfDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience function to decode a single invocation response
pub fn decode(data: &[u8]) -> Result<TypedObject> {
    AmfDecoder::new().decode(data)
}
