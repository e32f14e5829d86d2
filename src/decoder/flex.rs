//! Externalizable class handlers
//!
//! An AMF3 object whose traits are marked externalizable self-describes its
//! own body; the decoder must know the class to read it. Handlers exist for
//! the Flex data-services messages `DSA` (AsyncMessage) and `DSK`
//! (AcknowledgeMessage, which extends DSA), the Flex `ArrayCollection`
//! wrapper, and a fixed set of platform notification classes whose bodies
//! are length-prefixed JSON.
//!
//! Each handler fills the placeholder object that was already stored in
//! the AMF3 object table, so back-references to an externalizable object
//! resolve to the populated instance.
//!
//! DSA and DSK bodies are driven by flag blocks: one or more flag bytes,
//! read until a byte without the 0x80 continuation bit. Each recognized
//! bit consumes one AMF3 value into a named field; unrecognized bits below
//! position 6 each consume one AMF3 value that is discarded.

use uuid::Uuid;

use crate::error::{DecodeError, Result};
use crate::value::{AmfValue, ObjectHandle};

use super::AmfDecoder;

const CLASS_DSA: &str = "DSA";
const CLASS_DSK: &str = "DSK";
const CLASS_ARRAY_COLLECTION: &str = "flex.messaging.io.ArrayCollection";

/// Classes whose externalizable body is a u32-length-prefixed JSON blob
const JSON_WRAPPED_CLASSES: [&str; 4] = [
    "com.riotgames.platform.systemstate.ClientSystemStatesNotification",
    "com.riotgames.platform.broadcast.BroadcastNotification",
    "com.riotgames.platform.summoner.SummonerCatalog",
    "com.riotgames.platform.game.GameTypeConfigDTO",
];

impl AmfDecoder {
    /// Dispatch an externalizable body to its class handler
    pub(crate) fn read_externalizable(
        &mut self,
        class_name: &str,
        object: &ObjectHandle,
    ) -> Result<()> {
        match class_name {
            CLASS_DSK => self.read_dsk(object),
            CLASS_DSA => self.read_dsa(object),
            CLASS_ARRAY_COLLECTION => self.read_array_collection(object),
            name if JSON_WRAPPED_CLASSES.contains(&name) => self.read_json_wrapped(object),
            _ => Err(DecodeError::UnknownExternalizable {
                class_name: class_name.to_string(),
                raw: self.cursor.raw_hex(),
            }),
        }
    }

    /// One AMF3 value (an array) wrapped under a single `array` field
    fn read_array_collection(&mut self, object: &ObjectHandle) -> Result<()> {
        let value = self.decode_amf3()?;
        if !matches!(value, AmfValue::Array(_)) {
            return Err(DecodeError::UnexpectedValue { expected: "array" });
        }
        object.borrow_mut().insert("array", value);
        Ok(())
    }

    /// u32 byte length, then that many bytes of UTF-8 JSON. Members of a
    /// top-level JSON object become fields in document order; any other
    /// payload lands under a single `value` field.
    fn read_json_wrapped(&mut self, object: &ObjectHandle) -> Result<()> {
        let size = self.cursor.read_u32_be()? as usize;
        let bytes = self.cursor.read_bytes(size)?;
        let text = String::from_utf8_lossy(&bytes);
        let json: serde_json::Value = serde_json::from_str(&text)?;
        match json {
            serde_json::Value::Object(members) => {
                let mut target = object.borrow_mut();
                for (key, value) in members {
                    target.insert(key, json_to_value(value));
                }
            }
            other => object.borrow_mut().insert("value", json_to_value(other)),
        }
        Ok(())
    }

    /// Flex AsyncMessage: two flag blocks
    ///
    /// Block 1, flag 0 carries `body`, `clientId`, `destination`,
    /// `headers`, `messageId`, `timeStamp` and `timeToLive` in bits 0..6;
    /// flag 1 overrides `clientId` (bit 0) and `messageId` (bit 1) with
    /// byte arrays rendered as UUID strings. Block 2, flag 0 carries
    /// `correlationId` (bit 0) or, via bit 1, one discarded raw byte
    /// followed by a bare byte-array body rendered as a UUID string.
    fn read_dsa(&mut self, object: &ObjectHandle) -> Result<()> {
        object.borrow_mut().class_name = CLASS_DSA.to_string();

        let flags = self.read_flag_group()?;
        for (i, &flag) in flags.iter().enumerate() {
            let mut bits = 0;
            if i == 0 {
                for (mask, field) in [
                    (0x01, "body"),
                    (0x02, "clientId"),
                    (0x04, "destination"),
                    (0x08, "headers"),
                    (0x10, "messageId"),
                    (0x20, "timeStamp"),
                    (0x40, "timeToLive"),
                ] {
                    if flag & mask != 0 {
                        let value = self.decode_amf3()?;
                        object.borrow_mut().insert(field, value);
                    }
                }
                bits = 7;
            } else if i == 1 {
                if flag & 0x01 != 0 {
                    let id = self.read_uuid_field()?;
                    object.borrow_mut().insert("clientId", id);
                }
                if flag & 0x02 != 0 {
                    let id = self.read_uuid_field()?;
                    object.borrow_mut().insert("messageId", id);
                }
                bits = 2;
            }
            self.discard_flagged(flag, bits)?;
        }

        let flags = self.read_flag_group()?;
        for (i, &flag) in flags.iter().enumerate() {
            let mut bits = 0;
            if i == 0 {
                if flag & 0x01 != 0 {
                    let value = self.decode_amf3()?;
                    object.borrow_mut().insert("correlationId", value);
                }
                if flag & 0x02 != 0 {
                    let skipped = self.cursor.read_u8()?;
                    tracing::info!(byte = %format_args!("0x{:02x}", skipped), "ignoring byte");
                    let bytes = self.read_amf3_byte_array()?;
                    object.borrow_mut().insert("correlationId", uuid_string(&bytes)?);
                }
                bits = 2;
            }
            self.discard_flagged(flag, bits)?;
        }
        Ok(())
    }

    /// Flex AcknowledgeMessage: a DSA body followed by one more flag
    /// block whose set bits are all read and discarded
    fn read_dsk(&mut self, object: &ObjectHandle) -> Result<()> {
        self.read_dsa(object)?;
        let flags = self.read_flag_group()?;
        for &flag in &flags {
            self.discard_flagged(flag, 0)?;
        }
        Ok(())
    }

    /// Flag bytes until one lacks the 0x80 continuation bit
    fn read_flag_group(&mut self) -> Result<Vec<u8>> {
        let mut flags = Vec::new();
        loop {
            let flag = self.cursor.read_u8()?;
            flags.push(flag);
            if flag & 0x80 == 0 {
                break;
            }
        }
        Ok(flags)
    }

    /// Consume one AMF3 value per set bit in positions `bits..6`. Bit 7
    /// is the continuation marker, never a field.
    fn discard_flagged(&mut self, flag: u8, bits: u32) -> Result<()> {
        for i in bits..6 {
            if (flag >> i) & 0x01 != 0 {
                let value = self.decode_amf3()?;
                tracing::info!(value = %value, "ignoring AMF3 value");
            }
        }
        Ok(())
    }

    /// One AMF3 value that must be a byte array, rendered as a UUID string
    fn read_uuid_field(&mut self) -> Result<AmfValue> {
        match self.decode_amf3()? {
            AmfValue::ByteArray(bytes) => uuid_string(&bytes),
            _ => Err(DecodeError::UnexpectedValue { expected: "byte array" }),
        }
    }
}

/// Render exactly 16 bytes as a lowercase hyphenated UUID string
fn uuid_string(bytes: &[u8]) -> Result<AmfValue> {
    let uuid = Uuid::from_slice(bytes)
        .map_err(|_| DecodeError::InvalidUuid { length: bytes.len() })?;
    Ok(AmfValue::String(uuid.to_string()))
}

fn json_to_value(json: serde_json::Value) -> AmfValue {
    match json {
        serde_json::Value::Null => AmfValue::Null,
        serde_json::Value::Bool(b) => AmfValue::Boolean(b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) if i32::try_from(i).is_ok() => AmfValue::Integer(i as i32),
            _ => AmfValue::Number(n.as_f64().unwrap_or(f64::NAN)),
        },
        serde_json::Value::String(s) => AmfValue::String(s),
        serde_json::Value::Array(items) => {
            AmfValue::array(items.into_iter().map(json_to_value).collect())
        }
        serde_json::Value::Object(members) => {
            let mut object = crate::value::TypedObject::anonymous();
            for (key, value) in members {
                object.insert(key, json_to_value(value));
            }
            AmfValue::object(object)
        }
    }
}
