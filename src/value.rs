use std::collections::HashMap;
use std::fmt;

use crate::varint;

/// Arbitrary-precision integer stored as a sign and a 128-bit magnitude.
///
/// Covers `-(2^128 - 1)..=2^128 - 1`. Zero is never negative, so every
/// number has exactly one representation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct BigInt {
    negative: bool,
    magnitude: u128,
}

impl BigInt {
    pub const ZERO: BigInt = BigInt {
        negative: false,
        magnitude: 0,
    };

    pub const fn new(negative: bool, magnitude: u128) -> Self {
        BigInt {
            negative: negative && magnitude != 0,
            magnitude,
        }
    }

    pub const fn is_negative(&self) -> bool {
        self.negative
    }

    pub const fn magnitude(&self) -> u128 {
        self.magnitude
    }

    pub fn to_u128(&self) -> Option<u128> {
        (!self.negative).then_some(self.magnitude)
    }

    pub fn to_i128(&self) -> Option<i128> {
        if self.negative {
            // i128::MIN has magnitude 2^127
            (self.magnitude <= 1 << 127).then(|| (self.magnitude as i128).wrapping_neg())
        } else {
            i128::try_from(self.magnitude).ok()
        }
    }

    pub fn to_u64(&self) -> Option<u64> {
        self.to_u128().and_then(|n| u64::try_from(n).ok())
    }

    pub fn to_i64(&self) -> Option<i64> {
        self.to_i128().and_then(|n| i64::try_from(n).ok())
    }

    /// Zigzag image of the number, when it fits in 128 bits.
    pub fn zigzag(&self) -> Option<u128> {
        self.to_i128().map(varint::zigzag_encode_big)
    }
}

impl From<u128> for BigInt {
    fn from(n: u128) -> Self {
        BigInt::new(false, n)
    }
}

impl From<u64> for BigInt {
    fn from(n: u64) -> Self {
        BigInt::new(false, u128::from(n))
    }
}

impl From<i128> for BigInt {
    fn from(n: i128) -> Self {
        BigInt::new(n < 0, n.unsigned_abs())
    }
}

impl From<i64> for BigInt {
    fn from(n: i64) -> Self {
        BigInt::from(i128::from(n))
    }
}

impl fmt::Display for BigInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negative {
            write!(f, "-")?;
        }
        write!(f, "{}", self.magnitude)
    }
}

/// Dynamic value accepted and produced by both codecs.
///
/// Numbers compare by value across `Integer` and `BigInt`. `Json` compares
/// equal to any other value with the same JSON form, so an object decoded
/// from JSON text matches the `Object` it was written from.
#[derive(Clone, Debug)]
pub enum Value {
    /// Absent value; encodes to zero bytes in schema-driven mode.
    Undefined,
    /// Boolean value.
    Boolean(bool),
    /// Machine-width integer, written through the fixed-width kinds.
    Integer(i64),
    /// Arbitrary-precision integer.
    BigInt(BigInt),
    /// UTF-8 string.
    Str(String),
    /// Opaque bytes.
    Buffer(Vec<u8>),
    /// An ordered sequence, also used for union tuples.
    Array(Vec<Value>),
    /// A record with named fields.
    Object(HashMap<String, Value>),
    /// Structural data carried as JSON text.
    Json(serde_json::Value),
}

impl Value {
    /// Create a new empty object value.
    pub fn new_object() -> Self {
        Value::Object(HashMap::new())
    }

    /// Helper to build an object from key-value pairs.
    pub fn from_fields(fields: Vec<(&str, Value)>) -> Self {
        let mut map = HashMap::new();
        for (k, v) in fields {
            map.insert(k.to_string(), v);
        }
        Value::Object(map)
    }

    /// Get a field from an object value, returns None if not an object or field missing.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Object(map) => map.get(key),
            _ => None,
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bigint(&self) -> Option<BigInt> {
        match self {
            Value::BigInt(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Value::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_buffer(&self) -> Option<&[u8]> {
        match self {
            Value::Buffer(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&HashMap<String, Value>> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Value::Json(v) => Some(v),
            _ => None,
        }
    }

    /// Returns a short runtime type description, used in type errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::BigInt(_) => "bigint",
            Value::Str(_) => "string",
            Value::Buffer(_) => "buffer",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Json(_) => "json",
        }
    }

    /// Convert into a JSON value.
    ///
    /// Buffers, undefined, and big integers outside the 64-bit range have no
    /// JSON counterpart and yield `None`.
    pub fn to_json(&self) -> Option<serde_json::Value> {
        Some(match self {
            Value::Boolean(v) => serde_json::Value::Bool(*v),
            Value::Integer(v) => serde_json::Value::from(*v),
            Value::BigInt(n) => match (n.to_i64(), n.to_u64()) {
                (Some(i), _) => serde_json::Value::from(i),
                (None, Some(u)) => serde_json::Value::from(u),
                _ => return None,
            },
            Value::Str(v) => serde_json::Value::String(v.clone()),
            Value::Array(items) => serde_json::Value::Array(
                items.iter().map(Value::to_json).collect::<Option<Vec<_>>>()?,
            ),
            Value::Object(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(k, v)| Some((k.clone(), v.to_json()?)))
                    .collect::<Option<serde_json::Map<_, _>>>()?,
            ),
            Value::Json(v) => v.clone(),
            Value::Undefined | Value::Buffer(_) => return None,
        })
    }

    /// Convert from a JSON value.
    ///
    /// Objects, arrays, strings, booleans and integers map onto their native
    /// variants. Integers above `i64::MAX` become `BigInt`. Null and
    /// fractional numbers stay wrapped in `Json`.
    pub fn from_json(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Bool(b) => Value::Boolean(b),
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(k, v)| (k, Value::from_json(v)))
                    .collect(),
            ),
            serde_json::Value::Number(n) => match (n.as_i64(), n.as_u64()) {
                (Some(i), _) => Value::Integer(i),
                (None, Some(u)) => Value::BigInt(u.into()),
                _ => Value::Json(serde_json::Value::Number(n)),
            },
            null @ serde_json::Value::Null => Value::Json(null),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::BigInt(a), Value::BigInt(b)) => a == b,
            (Value::Integer(a), Value::BigInt(b)) | (Value::BigInt(b), Value::Integer(a)) => {
                BigInt::from(*a) == *b
            }
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Buffer(a), Value::Buffer(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Json(a), Value::Json(b)) => a == b,
            (Value::Json(json), other) | (other, Value::Json(json)) => {
                other.to_json().as_ref() == Some(json)
            }
            _ => false,
        }
    }
}

impl Eq for Value {}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Boolean(v) => write!(f, "{}", v),
            Value::Integer(v) => write!(f, "{}", v),
            Value::BigInt(v) => write!(f, "{}n", v),
            Value::Str(v) => write!(f, "\"{}\"", v),
            Value::Buffer(v) => write!(f, "<buffer {} bytes>", v.len()),
            Value::Object(map) => {
                let mut keys: Vec<&String> = map.keys().collect();
                keys.sort();
                write!(f, "{{ ")?;
                for (i, k) in keys.into_iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, map[k])?;
                }
                write!(f, " }}")
            }
            Value::Array(arr) => {
                write!(f, "[")?;
                for (i, v) in arr.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
            Value::Json(v) => write!(f, "{}", v),
        }
    }
}

// Conversion traits
impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<u8> for Value {
    fn from(v: u8) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<u16> for Value {
    fn from(v: u16) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<BigInt> for Value {
    fn from(v: BigInt) -> Self {
        Value::BigInt(v)
    }
}

impl From<i128> for Value {
    fn from(v: i128) -> Self {
        Value::BigInt(v.into())
    }
}

impl From<u128> for Value {
    fn from(v: u128) -> Self {
        Value::BigInt(v.into())
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Buffer(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Buffer(v.to_vec())
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Array(v)
    }
}

impl From<HashMap<String, Value>> for Value {
    fn from(v: HashMap<String, Value>) -> Self {
        Value::Object(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(v)
    }
}

impl From<Vec<String>> for Value {
    fn from(v: Vec<String>) -> Self {
        Value::Array(v.into_iter().map(Value::Str).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Undefined, Into::into)
    }
}

// TryFrom implementations for extracting values from Value
impl TryFrom<Value> for i64 {
    type Error = &'static str;
    fn try_from(v: Value) -> Result<Self, Self::Error> {
        match v {
            Value::Integer(i) => Ok(i),
            _ => Err("expected integer"),
        }
    }
}

impl TryFrom<Value> for BigInt {
    type Error = &'static str;
    fn try_from(v: Value) -> Result<Self, Self::Error> {
        match v {
            Value::BigInt(n) => Ok(n),
            Value::Integer(i) => Ok(i.into()),
            _ => Err("expected bigint"),
        }
    }
}

impl TryFrom<Value> for i128 {
    type Error = &'static str;
    fn try_from(v: Value) -> Result<Self, Self::Error> {
        BigInt::try_from(v)?.to_i128().ok_or("bigint outside the i128 range")
    }
}

impl TryFrom<Value> for u128 {
    type Error = &'static str;
    fn try_from(v: Value) -> Result<Self, Self::Error> {
        BigInt::try_from(v)?.to_u128().ok_or("negative bigint")
    }
}

impl TryFrom<Value> for String {
    type Error = &'static str;
    fn try_from(v: Value) -> Result<Self, Self::Error> {
        match v {
            Value::Str(s) => Ok(s),
            _ => Err("expected string"),
        }
    }
}

impl TryFrom<Value> for bool {
    type Error = &'static str;
    fn try_from(v: Value) -> Result<Self, Self::Error> {
        match v {
            Value::Boolean(b) => Ok(b),
            _ => Err("expected boolean"),
        }
    }
}

impl TryFrom<Value> for Vec<u8> {
    type Error = &'static str;
    fn try_from(v: Value) -> Result<Self, Self::Error> {
        match v {
            Value::Buffer(b) => Ok(b),
            _ => Err("expected buffer"),
        }
    }
}

impl TryFrom<Value> for Vec<String> {
    type Error = &'static str;
    fn try_from(v: Value) -> Result<Self, Self::Error> {
        match v {
            Value::Array(arr) => arr.into_iter().map(String::try_from).collect(),
            _ => Err("expected array"),
        }
    }
}
