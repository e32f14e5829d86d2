//! Test-local AMF3 encoder
//!
//! Independent of the decoder under test: everything is written inline
//! (no reference tables), using canonical U29 forms and sealed traits.

use amf_rs::AmfValue;

/// Canonical U29 encoding of a 29-bit value (sign bits above bit 28 are
/// dropped, matching the wire format's two's complement window)
pub fn encode_u29(value: i32) -> Vec<u8> {
    let v = (value as u32) & 0x1FFF_FFFF;
    if v < 0x80 {
        vec![v as u8]
    } else if v < 0x4000 {
        vec![(0x80 | (v >> 7)) as u8, (v & 0x7F) as u8]
    } else if v < 0x0020_0000 {
        vec![
            (0x80 | (v >> 14)) as u8,
            (0x80 | ((v >> 7) & 0x7F)) as u8,
            (v & 0x7F) as u8,
        ]
    } else {
        vec![
            (0x80 | (v >> 22)) as u8,
            (0x80 | ((v >> 15) & 0x7F)) as u8,
            (0x80 | ((v >> 8) & 0x7F)) as u8,
            (v & 0xFF) as u8,
        ]
    }
}

/// Inline AMF3 string body: length tag plus UTF-8 bytes. Only BMP text is
/// valid here; the suite's generators stay within it.
pub fn encode_amf3_string(s: &str, out: &mut Vec<u8>) {
    out.extend(encode_u29(((s.len() as i32) << 1) | 0x01));
    out.extend_from_slice(s.as_bytes());
}

/// One AMF3 value with its marker, fully inline
pub fn encode_amf3(value: &AmfValue, out: &mut Vec<u8>) {
    match value {
        AmfValue::Null => out.push(0x01),
        AmfValue::Boolean(false) => out.push(0x02),
        AmfValue::Boolean(true) => out.push(0x03),
        AmfValue::Integer(i) => {
            out.push(0x04);
            out.extend(encode_u29(*i));
        }
        AmfValue::Number(n) => {
            out.push(0x05);
            out.extend_from_slice(&n.to_be_bytes());
        }
        AmfValue::String(s) => {
            out.push(0x06);
            encode_amf3_string(s, out);
        }
        AmfValue::Date { millis, .. } => {
            out.push(0x08);
            out.extend(encode_u29(0x01));
            out.extend_from_slice(&(*millis as f64).to_be_bytes());
        }
        AmfValue::Array(elements) => {
            out.push(0x09);
            let elements = elements.borrow();
            out.extend(encode_u29(((elements.len() as i32) << 1) | 0x01));
            out.extend(encode_u29(0x01)); // empty key: dense only
            for element in elements.iter() {
                encode_amf3(element, out);
            }
        }
        AmfValue::Object(object) => {
            out.push(0x0A);
            let object = object.borrow();
            // Inline traits, sealed property list
            out.extend(encode_u29(((object.fields.len() as i32) << 4) | 0x03));
            encode_amf3_string(&object.class_name, out);
            for name in object.fields.keys() {
                encode_amf3_string(name, out);
            }
            for value in object.fields.values() {
                encode_amf3(value, out);
            }
        }
        AmfValue::ByteArray(bytes) => {
            out.push(0x0C);
            out.extend(encode_u29(((bytes.len() as i32) << 1) | 0x01));
            out.extend_from_slice(bytes);
        }
    }
}

/// A complete invocation response whose `data` field is the given AMF3
/// value; the other three fields are null
pub fn envelope_with_amf3(value: &AmfValue) -> Vec<u8> {
    let mut payload = vec![0x00, 0x05, 0x05, 0x05, 0x11];
    encode_amf3(value, &mut payload);
    payload
}
