//! Schema-less codec.
//!
//! Every value is written as a one-byte [`WireTag`] followed by its payload,
//! so any [`Value`] can be decoded without a declaration. Arrays nest fully
//! tagged elements.
//!
//! Big integers travel as sign and magnitude: `BigInt` carries a
//! non-negative magnitude and `NegativeBigInt` a negative one, each as an
//! unsigned big varint.

use crate::buffer::{Reader, Writer};
use crate::error::{DecodeError, EncodeError};
use crate::value::{BigInt, Value};

/// Deepest array nesting accepted by [`deserialize`].
pub const MAX_DEPTH: usize = 512;

/// Leading byte of every value in the schema-less encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WireTag {
    String = 0,
    Buffer = 1,
    UInt8 = 2,
    UInt16 = 3,
    UInt32 = 4,
    JsonObject = 5,
    BigInt = 6,
    Array = 7,
    /// Reserved for schema-driven mode.
    Union = 8,
    /// Reserved for schema-driven mode.
    Object = 9,
    Undefined = 10,
    Boolean = 11,
    Int32 = 12,
    NegativeBigInt = 13,
}

impl TryFrom<u8> for WireTag {
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        Ok(match byte {
            0 => WireTag::String,
            1 => WireTag::Buffer,
            2 => WireTag::UInt8,
            3 => WireTag::UInt16,
            4 => WireTag::UInt32,
            5 => WireTag::JsonObject,
            6 => WireTag::BigInt,
            7 => WireTag::Array,
            8 => WireTag::Union,
            9 => WireTag::Object,
            10 => WireTag::Undefined,
            11 => WireTag::Boolean,
            12 => WireTag::Int32,
            13 => WireTag::NegativeBigInt,
            other => return Err(other),
        })
    }
}

/// Serialize `value` into a new vector.
pub fn serialize(value: &Value) -> Result<Vec<u8>, EncodeError> {
    let mut writer = Writer::new();
    serialize_into(&mut writer, value)?;
    Ok(writer.into_vec())
}

/// Serialize `value` at the writer's cursor.
pub fn serialize_into(writer: &mut Writer, value: &Value) -> Result<(), EncodeError> {
    match value {
        Value::Undefined => writer.write_u8(WireTag::Undefined as u8),
        Value::Boolean(b) => {
            writer.write_u8(WireTag::Boolean as u8);
            writer.write_bool(*b);
        }
        Value::BigInt(n) => {
            let tag = if n.is_negative() {
                WireTag::NegativeBigInt
            } else {
                WireTag::BigInt
            };
            writer.write_u8(tag as u8);
            writer.write_big_uint(n.magnitude());
        }
        Value::Integer(n) => {
            if let Ok(n) = i32::try_from(*n) {
                writer.write_u8(WireTag::Int32 as u8);
                writer.write_i32(n);
            } else if let Ok(n) = u32::try_from(*n) {
                writer.write_u8(WireTag::UInt32 as u8);
                writer.write_u32(n);
            } else {
                return Err(EncodeError::Unsupported(format!(
                    "integer {n} outside the 32-bit range, use a bigint"
                )));
            }
        }
        Value::Str(s) => {
            writer.write_u8(WireTag::String as u8);
            writer.write_string(s);
        }
        Value::Buffer(b) => {
            writer.write_u8(WireTag::Buffer as u8);
            writer.write_buffer(b);
        }
        Value::Array(items) => {
            writer.write_u8(WireTag::Array as u8);
            writer.write_uint_var(items.len() as u64);
            for item in items {
                serialize_into(writer, item)?;
            }
        }
        Value::Json(json) => write_json(writer, json)?,
        Value::Object(_) => {
            let json = value.to_json().ok_or_else(|| {
                EncodeError::Unsupported(
                    "object holding buffers, undefined or bigints wider than 64 bits; only JSON-representable objects are supported"
                        .to_string(),
                )
            })?;
            write_json(writer, &json)?;
        }
    }
    Ok(())
}

fn write_json(writer: &mut Writer, json: &serde_json::Value) -> Result<(), EncodeError> {
    let text = serde_json::to_string(json).map_err(|source| EncodeError::Json {
        field: String::new(),
        source,
    })?;
    writer.write_u8(WireTag::JsonObject as u8);
    writer.write_string(&text);
    Ok(())
}

/// Deserialize one value spanning all of `bytes`.
pub fn deserialize(bytes: &[u8]) -> Result<Value, DecodeError> {
    let mut reader = Reader::new(bytes);
    let value = deserialize_from(&mut reader)?;
    if !reader.is_exhausted() {
        return Err(DecodeError::TrailingBytes {
            remaining: reader.remaining(),
        });
    }
    Ok(value)
}

/// Deserialize one value at the reader's cursor.
pub fn deserialize_from(reader: &mut Reader<'_>) -> Result<Value, DecodeError> {
    read_value(reader, 0)
}

fn read_value(reader: &mut Reader<'_>, depth: usize) -> Result<Value, DecodeError> {
    if depth > MAX_DEPTH {
        return Err(DecodeError::DepthLimit(MAX_DEPTH));
    }
    let offset = reader.offset();
    let tag = reader.read_u8()?;
    let tag = WireTag::try_from(tag).map_err(|tag| DecodeError::UnknownWireTag { tag, offset })?;

    Ok(match tag {
        WireTag::Undefined => Value::Undefined,
        WireTag::Boolean => Value::Boolean(reader.read_bool()?),
        WireTag::String => Value::Str(reader.read_string()?),
        WireTag::Buffer => Value::Buffer(reader.read_buffer()?.to_vec()),
        WireTag::UInt8 => Value::from(reader.read_u8()?),
        WireTag::UInt16 => Value::from(reader.read_u16()?),
        WireTag::UInt32 => Value::from(reader.read_u32()?),
        WireTag::Int32 => Value::from(reader.read_i32()?),
        WireTag::BigInt => Value::from(reader.read_big_uint()?),
        WireTag::NegativeBigInt => {
            let magnitude_offset = reader.offset();
            let magnitude = reader.read_big_uint()?;
            if magnitude == 0 {
                return Err(DecodeError::NegativeZero {
                    offset: magnitude_offset,
                });
            }
            Value::BigInt(BigInt::new(true, magnitude))
        }
        WireTag::JsonObject => {
            let json: serde_json::Value = serde_json::from_slice(reader.read_buffer()?)?;
            if json.is_object() {
                Value::from_json(json)
            } else {
                Value::Json(json)
            }
        }
        WireTag::Array => {
            let count_offset = reader.offset();
            let count = reader.read_uint_var()?;
            // every element carries at least its tag byte
            if count > reader.remaining() as u64 {
                return Err(DecodeError::OutOfBounds {
                    offset: count_offset,
                    need: usize::try_from(count).unwrap_or(usize::MAX),
                    have: reader.remaining(),
                });
            }
            let mut items = Vec::with_capacity(count as usize);
            for _ in 0..count {
                items.push(read_value(reader, depth + 1)?);
            }
            Value::Array(items)
        }
        WireTag::Union | WireTag::Object => {
            return Err(DecodeError::UnknownWireTag {
                tag: tag as u8,
                offset,
            })
        }
    })
}
