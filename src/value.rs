//! AMF value types
//!
//! Both AMF0 and AMF3 decode into a common value representation. Containers
//! (arrays and objects) are shared handles so that AMF reference-table
//! back-references alias the original instance, including objects that
//! reference themselves or an ancestor mid-construction.
//!
//! Equality and `Debug` recurse structurally; compare values that are part
//! of a reference cycle by handle identity (`Rc::ptr_eq`) instead.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use bytes::Bytes;
use indexmap::IndexMap;

/// Token emitted for the AMF3 undefined marker (0x00)
pub const UNDEFINED_TOKEN: &str = "AMF3_UNDEFINED";

/// Shared handle to a dense array under construction or completed
pub type ArrayHandle = Rc<RefCell<Vec<AmfValue>>>;

/// Shared handle to a typed object under construction or completed
pub type ObjectHandle = Rc<RefCell<TypedObject>>;

/// Unified AMF value representation
///
/// Covers every type the decoder emits. Some variants are dialect-specific:
/// `Integer` and `ByteArray` only occur in AMF3 streams.
#[derive(Debug, Clone, PartialEq)]
pub enum AmfValue {
    /// Null value (AMF0: 0x05, AMF3: 0x01)
    Null,

    /// Boolean value (AMF0: 0x01, AMF3: 0x02/0x03)
    Boolean(bool),

    /// IEEE 754 double-precision floating point (AMF0: 0x00, AMF3: 0x05)
    Number(f64),

    /// 29-bit signed integer, sign-extended to 32 bits (AMF3 only: 0x04)
    Integer(i32),

    /// UTF-8 string (AMF0: 0x02, AMF3: 0x06)
    String(String),

    /// Raw byte array (AMF3 only: 0x0C)
    ByteArray(Bytes),

    /// Date as milliseconds since the Unix epoch plus a zone offset in
    /// whole hours (AMF0: 0x0B, AMF3: 0x08; AMF3 dates are always UTC)
    Date { millis: i64, offset_hours: i32 },

    /// Dense zero-based array (AMF0: 0x0A, AMF3: 0x09)
    Array(ArrayHandle),

    /// Typed object (AMF0: 0x03/0x10, AMF3: 0x0A)
    Object(ObjectHandle),
}

impl AmfValue {
    /// Wrap a vector in a shared array handle
    pub fn array(elements: Vec<AmfValue>) -> Self {
        AmfValue::Array(Rc::new(RefCell::new(elements)))
    }

    /// Wrap a typed object in a shared object handle
    pub fn object(object: TypedObject) -> Self {
        AmfValue::Object(Rc::new(RefCell::new(object)))
    }

    /// Try to get this value as a string reference
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AmfValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get this value as a number
    pub fn as_number(&self) -> Option<f64> {
        match self {
            AmfValue::Number(n) => Some(*n),
            AmfValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Try to get this value as a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AmfValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get this value as an array handle
    pub fn as_array(&self) -> Option<&ArrayHandle> {
        match self {
            AmfValue::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Try to get this value as an object handle
    pub fn as_object(&self) -> Option<&ObjectHandle> {
        match self {
            AmfValue::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Check if this value is null
    pub fn is_null(&self) -> bool {
        matches!(self, AmfValue::Null)
    }

    /// Get a field from an object value (cloned; container clones are
    /// shallow handle copies)
    pub fn get(&self, key: &str) -> Option<AmfValue> {
        match self {
            AmfValue::Object(o) => o.borrow().fields.get(key).cloned(),
            _ => None,
        }
    }
}

impl Default for AmfValue {
    fn default() -> Self {
        AmfValue::Null
    }
}

impl From<bool> for AmfValue {
    fn from(v: bool) -> Self {
        AmfValue::Boolean(v)
    }
}

impl From<f64> for AmfValue {
    fn from(v: f64) -> Self {
        AmfValue::Number(v)
    }
}

impl From<i32> for AmfValue {
    fn from(v: i32) -> Self {
        AmfValue::Integer(v)
    }
}

impl From<String> for AmfValue {
    fn from(v: String) -> Self {
        AmfValue::String(v)
    }
}

impl From<&str> for AmfValue {
    fn from(v: &str) -> Self {
        AmfValue::String(v.to_string())
    }
}

impl From<Vec<AmfValue>> for AmfValue {
    fn from(v: Vec<AmfValue>) -> Self {
        AmfValue::array(v)
    }
}

impl From<TypedObject> for AmfValue {
    fn from(v: TypedObject) -> Self {
        AmfValue::object(v)
    }
}

/// Shallow rendering used by decode traces. Containers print a summary
/// rather than their contents so a cyclic value never recurses.
impl fmt::Display for AmfValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AmfValue::Null => write!(f, "nil"),
            AmfValue::Boolean(b) => write!(f, "{}", b),
            AmfValue::Number(n) => write!(f, "{}", n),
            AmfValue::Integer(i) => write!(f, "{}", i),
            AmfValue::String(s) => write!(f, "{:?}", s),
            AmfValue::ByteArray(b) => write!(f, "bytes[{}]", b.len()),
            AmfValue::Date { millis, offset_hours } => {
                write!(f, "date({}ms utc{:+})", millis, offset_hours)
            }
            AmfValue::Array(a) => write!(f, "array[{}]", a.borrow().len()),
            AmfValue::Object(o) => {
                let o = o.borrow();
                if o.class_name.is_empty() {
                    write!(f, "object({} fields)", o.fields.len())
                } else {
                    write!(f, "object({}, {} fields)", o.class_name, o.fields.len())
                }
            }
        }
    }
}

/// Ordered key-value object tagged with a class name
///
/// Field order is the order properties were declared on the wire, which
/// downstream consumers rely on. Keys are unique per object; inserting an
/// existing key overwrites its value in place.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TypedObject {
    /// AMF class name; empty for anonymous AMF0 objects
    pub class_name: String,
    /// Fields in wire declaration order
    pub fields: IndexMap<String, AmfValue>,
}

impl TypedObject {
    /// Create an empty object with the given class name
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            fields: IndexMap::new(),
        }
    }

    /// Create an empty anonymous object
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Bind a field, preserving first-insertion order
    pub fn insert(&mut self, key: impl Into<String>, value: AmfValue) {
        self.fields.insert(key.into(), value);
    }

    /// Look up a field by name
    pub fn get(&self, key: &str) -> Option<&AmfValue> {
        self.fields.get(key)
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the object has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Move this object into a shared handle
    pub fn into_handle(self) -> ObjectHandle {
        Rc::new(RefCell::new(self))
    }
}

/// AMF3 traits: the shape of an object as declared on the wire
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClassDefinition {
    /// Declared class name; empty for anonymous objects
    pub class_name: String,
    /// Class self-describes its own body (encoding == 1)
    pub externalizable: bool,
    /// Sealed properties are followed by dynamic pairs (encoding == 2)
    pub dynamic: bool,
    /// Raw 2-bit trait encoding: 0 = property list, 1 = externalizable,
    /// 2 = dynamic, 3 = reserved
    pub encoding: u8,
    /// Sealed property names in declaration order
    pub properties: Vec<String>,
}
