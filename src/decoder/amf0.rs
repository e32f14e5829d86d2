//! AMF0 marker set and dispatcher
//!
//! AMF0 is the original Action Message Format. Within an invocation
//! response every top-level value starts out as AMF0; the avmplus marker
//! (0x11) switches the remainder of that value to AMF3.
//!
//! Type markers:
//! ```text
//! 0x00 - Number (IEEE 754 double)
//! 0x01 - Boolean
//! 0x02 - String (UTF-8, 16-bit length prefix)
//! 0x03 - Object (key-value pairs until the object-end sentinel)
//! 0x04 - MovieClip (reserved, not supported)
//! 0x05 - Null
//! 0x06 - Undefined (not supported)
//! 0x07 - Reference (16-bit index)
//! 0x08 - Mixed Array (not supported)
//! 0x09 - Object End
//! 0x0A - Strict Array (dense array)
//! 0x0B - Date (double + timezone minutes)
//! 0x0C - Long String (not supported)
//! 0x0D - Unsupported
//! 0x0E - RecordSet (reserved, not supported)
//! 0x0F - XML Document (not supported)
//! 0x10 - Typed Object (class name + properties)
//! 0x11 - AVM+ (switch to AMF3)
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::{DecodeError, Dialect, Result};
use crate::value::{AmfValue, ArrayHandle, ObjectHandle, TypedObject};

use super::AmfDecoder;

/// AMF0 type markers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Amf0Marker {
    Number,
    Boolean,
    String,
    Object,
    MovieClip,
    Null,
    Undefined,
    Reference,
    MixedArray,
    ObjectEnd,
    StrictArray,
    Date,
    LongString,
    Unsupported,
    RecordSet,
    Xml,
    TypedObject,
    AvmPlus,
}

impl Amf0Marker {
    fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Amf0Marker::Number),
            0x01 => Some(Amf0Marker::Boolean),
            0x02 => Some(Amf0Marker::String),
            0x03 => Some(Amf0Marker::Object),
            0x04 => Some(Amf0Marker::MovieClip),
            0x05 => Some(Amf0Marker::Null),
            0x06 => Some(Amf0Marker::Undefined),
            0x07 => Some(Amf0Marker::Reference),
            0x08 => Some(Amf0Marker::MixedArray),
            0x09 => Some(Amf0Marker::ObjectEnd),
            0x0A => Some(Amf0Marker::StrictArray),
            0x0B => Some(Amf0Marker::Date),
            0x0C => Some(Amf0Marker::LongString),
            0x0D => Some(Amf0Marker::Unsupported),
            0x0E => Some(Amf0Marker::RecordSet),
            0x0F => Some(Amf0Marker::Xml),
            0x10 => Some(Amf0Marker::TypedObject),
            0x11 => Some(Amf0Marker::AvmPlus),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Amf0Marker::Number => "number",
            Amf0Marker::Boolean => "boolean",
            Amf0Marker::String => "string",
            Amf0Marker::Object => "object",
            Amf0Marker::MovieClip => "movieclip",
            Amf0Marker::Null => "null",
            Amf0Marker::Undefined => "undefined",
            Amf0Marker::Reference => "reference",
            Amf0Marker::MixedArray => "mixed-array",
            Amf0Marker::ObjectEnd => "object-end",
            Amf0Marker::StrictArray => "array",
            Amf0Marker::Date => "date",
            Amf0Marker::LongString => "long-string",
            Amf0Marker::Unsupported => "unsupported",
            Amf0Marker::RecordSet => "recordset",
            Amf0Marker::Xml => "xml",
            Amf0Marker::TypedObject => "typed-object",
            Amf0Marker::AvmPlus => "avmplus",
        }
    }
}

/// Outcome of one AMF0 dispatch. The object-end sentinel terminates
/// key-value bodies and never surfaces as a value.
pub(crate) enum Amf0Item {
    Value(AmfValue),
    End,
}

impl AmfDecoder {
    /// Decode one AMF0 value where the object-end sentinel is not legal
    pub(crate) fn decode_amf0_value(&mut self) -> Result<AmfValue> {
        match self.decode_amf0()? {
            Amf0Item::Value(value) => Ok(value),
            Amf0Item::End => Err(DecodeError::UnsupportedType {
                dialect: Dialect::Amf0,
                name: Amf0Marker::ObjectEnd.name(),
            }),
        }
    }

    /// Dispatch on one AMF0 marker byte
    pub(crate) fn decode_amf0(&mut self) -> Result<Amf0Item> {
        let op = self.cursor.read_u8()?;
        let marker = Amf0Marker::from_u8(op).ok_or(DecodeError::UnknownMarker {
            dialect: Dialect::Amf0,
            marker: op,
        })?;
        self.enter_nested()?;
        let result = self.read_amf0_body(marker);
        self.leave_nested();
        let item = result?;
        match &item {
            Amf0Item::Value(value) => {
                tracing::debug!(kind = marker.name(), value = %value, "AMF0 value")
            }
            Amf0Item::End => tracing::debug!(kind = marker.name(), "AMF0 value"),
        }
        Ok(item)
    }

    fn read_amf0_body(&mut self, marker: Amf0Marker) -> Result<Amf0Item> {
        let value = match marker {
            Amf0Marker::Number => AmfValue::Number(self.cursor.read_f64_be()?),
            Amf0Marker::Boolean => AmfValue::Boolean(self.cursor.read_bool()?),
            Amf0Marker::String => AmfValue::String(self.read_amf0_string()?),
            Amf0Marker::Object => self.read_amf0_object()?,
            Amf0Marker::Null => AmfValue::Null,
            Amf0Marker::Reference => self.read_amf0_reference()?,
            Amf0Marker::ObjectEnd => return Ok(Amf0Item::End),
            Amf0Marker::StrictArray => self.read_amf0_array()?,
            Amf0Marker::Date => self.read_amf0_date()?,
            Amf0Marker::TypedObject => self.read_amf0_typed_object()?,
            Amf0Marker::AvmPlus => self.decode_amf3()?,
            unsupported => {
                return Err(DecodeError::UnsupportedType {
                    dialect: Dialect::Amf0,
                    name: unsupported.name(),
                })
            }
        };
        Ok(Amf0Item::Value(value))
    }

    /// 16-bit length-prefixed UTF-8; a zero length yields the empty string
    pub(crate) fn read_amf0_string(&mut self) -> Result<String> {
        let length = self.cursor.read_u16_be()? as usize;
        if length == 0 {
            return Ok(String::new());
        }
        let bytes = self.cursor.read_bytes(length)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn read_amf0_object(&mut self) -> Result<AmfValue> {
        let object = TypedObject::anonymous().into_handle();
        self.read_amf0_object_body(&object)?;
        Ok(AmfValue::Object(object))
    }

    /// Key-value pairs until a value decodes to the object-end sentinel.
    /// The terminating pair (canonically an empty key) is not stored.
    fn read_amf0_object_body(&mut self, object: &ObjectHandle) -> Result<()> {
        loop {
            let key = self.read_amf0_string()?;
            match self.decode_amf0()? {
                Amf0Item::End => break,
                Amf0Item::Value(value) => object.borrow_mut().insert(key, value),
            }
        }
        Ok(())
    }

    fn read_amf0_reference(&mut self) -> Result<AmfValue> {
        let index = self.cursor.read_u16_be()? as usize;
        self.stored_amf0_object(index)
    }

    /// The array handle is stored into the reference table before its
    /// elements are decoded so elements may refer back to it.
    fn read_amf0_array(&mut self) -> Result<AmfValue> {
        let count = self.cursor.read_u32_be()? as usize;
        let handle: ArrayHandle =
            Rc::new(RefCell::new(Vec::with_capacity(count.min(self.cursor.remaining()))));
        self.store_amf0_object(AmfValue::Array(handle.clone()));
        for _ in 0..count {
            let element = self.decode_amf0_value()?;
            handle.borrow_mut().push(element);
        }
        Ok(AmfValue::Array(handle))
    }

    /// Milliseconds since epoch plus a timezone offset in minutes,
    /// truncated to whole hours
    fn read_amf0_date(&mut self) -> Result<AmfValue> {
        let millis = self.cursor.read_f64_be()? as i64;
        let minutes = self.cursor.read_u16_be()? as i16;
        let offset_hours = minutes as i32 / 60;
        Ok(AmfValue::Date { millis, offset_hours })
    }

    fn read_amf0_typed_object(&mut self) -> Result<AmfValue> {
        let object = TypedObject::anonymous().into_handle();
        self.store_amf0_object(AmfValue::Object(object.clone()));
        let class_name = self.read_amf0_string()?;
        object.borrow_mut().class_name = class_name;
        self.read_amf0_object_body(&object)?;
        Ok(AmfValue::Object(object))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn decoder(bytes: &[u8]) -> AmfDecoder {
        let mut decoder = AmfDecoder::new();
        decoder.reset(Bytes::copy_from_slice(bytes));
        decoder
    }

    fn decode_one(bytes: &[u8]) -> Result<AmfValue> {
        decoder(bytes).decode_amf0_value()
    }

    #[test]
    fn test_scalars() {
        assert_eq!(
            decode_one(&[0x00, 0x3F, 0xF0, 0, 0, 0, 0, 0, 0]).unwrap(),
            AmfValue::Number(1.0)
        );
        assert_eq!(decode_one(&[0x01, 0x01]).unwrap(), AmfValue::Boolean(true));
        assert_eq!(decode_one(&[0x01, 0x00]).unwrap(), AmfValue::Boolean(false));
        assert_eq!(decode_one(&[0x05]).unwrap(), AmfValue::Null);
        assert_eq!(
            decode_one(&[0x02, 0x00, 0x03, 0x66, 0x6F, 0x6F]).unwrap(),
            AmfValue::String("foo".into())
        );
        assert_eq!(
            decode_one(&[0x02, 0x00, 0x00]).unwrap(),
            AmfValue::String(String::new())
        );
    }

    #[test]
    fn test_anonymous_object() {
        // { "a": 1.0 } with the canonical empty-key terminator
        let value = decode_one(&[
            0x03, // object
            0x00, 0x01, 0x61, // key "a"
            0x00, 0x3F, 0xF0, 0, 0, 0, 0, 0, 0, // 1.0
            0x00, 0x00, 0x09, // empty key + object end
        ])
        .unwrap();
        let object = value.as_object().unwrap().borrow();
        assert_eq!(object.class_name, "");
        assert_eq!(object.len(), 1);
        assert_eq!(object.get("a"), Some(&AmfValue::Number(1.0)));
    }

    #[test]
    fn test_typed_object() {
        let value = decode_one(&[
            0x10, // typed object
            0x00, 0x04, 0x55, 0x73, 0x65, 0x72, // class "User"
            0x00, 0x02, 0x6F, 0x6B, // key "ok"
            0x01, 0x01, // true
            0x00, 0x00, 0x09,
        ])
        .unwrap();
        let object = value.as_object().unwrap().borrow();
        assert_eq!(object.class_name, "User");
        assert_eq!(object.get("ok"), Some(&AmfValue::Boolean(true)));
    }

    #[test]
    fn test_array_and_reference() {
        // [null, true] followed by a reference back to the array itself
        let value = decode_one(&[
            0x0A, 0x00, 0x00, 0x00, 0x03, // 3 elements
            0x05, // null
            0x01, 0x01, // true
            0x07, 0x00, 0x00, // reference index 0 (the array)
        ])
        .unwrap();
        let array = value.as_array().unwrap();
        let elements = array.borrow();
        assert_eq!(elements.len(), 3);
        assert_eq!(elements[0], AmfValue::Null);
        assert_eq!(elements[1], AmfValue::Boolean(true));
        match &elements[2] {
            AmfValue::Array(inner) => assert!(Rc::ptr_eq(inner, array)),
            other => panic!("expected array reference, got {:?}", other),
        }
    }

    #[test]
    fn test_reference_out_of_range() {
        let err = decode_one(&[0x07, 0x00, 0x02]).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::ReferenceOutOfRange { index: 2, .. }
        ));
    }

    #[test]
    fn test_date() {
        // 1_000ms, +120 minutes
        let mut bytes = vec![0x0B];
        bytes.extend_from_slice(&1000f64.to_be_bytes());
        bytes.extend_from_slice(&[0x00, 0x78]);
        assert_eq!(
            decode_one(&bytes).unwrap(),
            AmfValue::Date { millis: 1000, offset_hours: 2 }
        );

        // Negative offsets truncate toward zero: -90 minutes is -1 hour
        let mut bytes = vec![0x0B];
        bytes.extend_from_slice(&0f64.to_be_bytes());
        bytes.extend_from_slice(&(-90i16).to_be_bytes());
        assert_eq!(
            decode_one(&bytes).unwrap(),
            AmfValue::Date { millis: 0, offset_hours: -1 }
        );
    }

    #[test]
    fn test_unsupported_markers() {
        for (marker, name) in [
            (0x04u8, "movieclip"),
            (0x06, "undefined"),
            (0x08, "mixed-array"),
            (0x0C, "long-string"),
            (0x0D, "unsupported"),
            (0x0E, "recordset"),
            (0x0F, "xml"),
        ] {
            match decode_one(&[marker]).unwrap_err() {
                DecodeError::UnsupportedType { dialect: Dialect::Amf0, name: got } => {
                    assert_eq!(got, name)
                }
                other => panic!("expected UnsupportedType for 0x{:02x}, got {:?}", marker, other),
            }
        }
    }

    #[test]
    fn test_unknown_marker() {
        assert!(matches!(
            decode_one(&[0x42]).unwrap_err(),
            DecodeError::UnknownMarker { dialect: Dialect::Amf0, marker: 0x42 }
        ));
    }

    #[test]
    fn test_bare_object_end_rejected() {
        assert!(matches!(
            decode_one(&[0x09]).unwrap_err(),
            DecodeError::UnsupportedType { dialect: Dialect::Amf0, name: "object-end" }
        ));
    }

    #[test]
    fn test_nesting_guard() {
        // 100 nested single-element arrays exceed the default depth cap
        let mut bytes = Vec::new();
        for _ in 0..100 {
            bytes.extend_from_slice(&[0x0A, 0x00, 0x00, 0x00, 0x01]);
        }
        bytes.push(0x05);
        assert!(matches!(
            decode_one(&bytes).unwrap_err(),
            DecodeError::NestingTooDeep
        ));
    }
}
