//! Schema-driven codec.
//!
//! [`Protocol::compile`] walks a [`SchemaNode`] tree once and produces a tree
//! of boxed write steps and a tree of read steps. Encoding and decoding then
//! run those steps without looking at the declaration again.
//!
//! Wire layout (no type tags; both sides share the schema):
//!
//! * `UInt8`/`UInt16`/`UInt32`/`Int32`: fixed width, big-endian by default
//! * `Boolean`: one byte, `0` or `1`
//! * `String`/`Buffer`/`JSONFallback`: varint length, then the bytes
//! * `BigInt`: zigzag big-integer varint, so signed values within `i128`
//! * `UBigInt`: big-integer varint covering all of `u128`
//! * `Undefined`: nothing
//! * `Array`: varint count, then each element. Decoding rejects counts above
//!   [`ProtocolOptions::max_array_len`].
//! * `Union`: one byte element count, then each position
//! * `Object`: one byte field count, then `(name, value)` pairs

mod decoder;
mod encoder;

use std::fmt;

use tracing::debug;

use crate::buffer::{Endian, Reader, Writer};
use crate::error::{DecodeError, EncodeError, SchemaError};
use crate::schema::SchemaNode;
use crate::value::Value;

use decoder::ReadStep;
use encoder::WriteStep;

/// Options applied when compiling a [`Protocol`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolOptions {
    /// Capacity of the writer allocated for each encode, and of an
    /// [`Encoder`]'s scratch buffer.
    pub initial_capacity: usize,
    /// Byte order of fixed-width integers.
    pub endian: Endian,
    /// Longest array accepted on decode. Arrays of `Undefined` take no bytes
    /// per element, so the input length alone does not bound them.
    pub max_array_len: usize,
}

impl Default for ProtocolOptions {
    fn default() -> Self {
        ProtocolOptions {
            initial_capacity: 1024,
            endian: Endian::Big,
            max_array_len: 1 << 20,
        }
    }
}

/// An encode/decode pair compiled from one schema.
pub struct Protocol {
    schema: SchemaNode,
    options: ProtocolOptions,
    write: WriteStep,
    read: ReadStep,
}

impl Protocol {
    /// Compile `schema` with default options.
    pub fn compile(schema: SchemaNode) -> Result<Self, SchemaError> {
        Self::with_options(schema, ProtocolOptions::default())
    }

    /// Compile `schema` with the given options.
    pub fn with_options(schema: SchemaNode, options: ProtocolOptions) -> Result<Self, SchemaError> {
        let write = encoder::compile_writer(&schema)?;
        let read = decoder::compile_reader(&schema, &options);
        debug!(
            schema = %schema.name,
            kind = schema.kind.name(),
            endian = ?options.endian,
            max_array_len = options.max_array_len,
            "compiled protocol"
        );
        Ok(Protocol {
            schema,
            options,
            write,
            read,
        })
    }

    /// The declaration this protocol was compiled from.
    pub fn schema(&self) -> &SchemaNode {
        &self.schema
    }

    pub fn options(&self) -> ProtocolOptions {
        self.options
    }

    fn new_writer(&self) -> Writer {
        Writer::with_capacity(self.options.initial_capacity).with_endian(self.options.endian)
    }

    /// Encode `value` into a new vector.
    ///
    /// Fails before writing a field whose value does not match its declared
    /// kind.
    pub fn encode(&self, value: &Value) -> Result<Vec<u8>, EncodeError> {
        let mut writer = self.new_writer();
        (self.write)(&mut writer, value)?;
        Ok(writer.into_vec())
    }

    /// Encode `value` at the cursor of an existing writer.
    ///
    /// On error the writer keeps whatever was written before the failing
    /// field.
    pub fn encode_into(&self, writer: &mut Writer, value: &Value) -> Result<(), EncodeError> {
        (self.write)(writer, value)
    }

    /// Decode one value spanning all of `bytes`.
    pub fn decode(&self, bytes: &[u8]) -> Result<Value, DecodeError> {
        let mut reader = Reader::new(bytes).with_endian(self.options.endian);
        let value = (self.read)(&mut reader)?;
        if !reader.is_exhausted() {
            return Err(DecodeError::TrailingBytes {
                remaining: reader.remaining(),
            });
        }
        Ok(value)
    }

    /// Decode one value at the reader's cursor, leaving any following bytes
    /// unread.
    pub fn decode_from(&self, reader: &mut Reader<'_>) -> Result<Value, DecodeError> {
        (self.read)(reader)
    }

    /// An encoder that reuses one scratch buffer across calls.
    pub fn encoder(&self) -> Encoder<'_> {
        Encoder {
            protocol: self,
            scratch: self.new_writer(),
        }
    }
}

impl fmt::Debug for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Protocol")
            .field("schema", &self.schema)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// A [`Protocol`] paired with a reusable scratch buffer.
///
/// `encode` takes `&mut self`, so a result is always copied out before the
/// scratch can be written again. Use one encoder per thread.
#[derive(Debug)]
pub struct Encoder<'p> {
    protocol: &'p Protocol,
    scratch: Writer,
}

impl Encoder<'_> {
    /// Encode `value`, returning a fresh copy of the encoded bytes.
    ///
    /// The scratch buffer grows as needed and keeps its size for later calls.
    pub fn encode(&mut self, value: &Value) -> Result<Vec<u8>, EncodeError> {
        self.scratch.reset();
        (self.protocol.write)(&mut self.scratch, value)?;
        Ok(self.scratch.dump())
    }

    /// Current capacity of the scratch buffer.
    pub fn scratch_capacity(&self) -> usize {
        self.scratch.capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaNode;

    #[test]
    fn test_trailing_bytes_rejected() {
        let protocol = Protocol::compile(SchemaNode::uint8("n")).unwrap();
        assert!(matches!(
            protocol.decode(&[1, 2]),
            Err(DecodeError::TrailingBytes { remaining: 1 })
        ));

        let mut reader = Reader::new(&[1, 2]);
        assert_eq!(protocol.decode_from(&mut reader).unwrap(), Value::Integer(1));
        assert_eq!(reader.remaining(), 1);
    }

    #[test]
    fn test_little_endian_option() {
        let options = ProtocolOptions {
            endian: Endian::Little,
            ..ProtocolOptions::default()
        };
        let protocol = Protocol::with_options(SchemaNode::uint16("n"), options).unwrap();
        let bytes = protocol.encode(&0x0102u16.into()).unwrap();
        assert_eq!(bytes, vec![0x02, 0x01]);
        assert_eq!(protocol.decode(&bytes).unwrap(), Value::Integer(0x0102));
    }

    #[test]
    fn test_max_array_len_option() {
        let schema = SchemaNode::array("flags", SchemaNode::boolean("flag"));
        let options = ProtocolOptions {
            max_array_len: 2,
            ..ProtocolOptions::default()
        };
        let strict = Protocol::with_options(schema.clone(), options).unwrap();
        let lenient = Protocol::compile(schema).unwrap();

        let bytes = lenient.encode(&Value::Array(vec![true.into(); 3])).unwrap();
        assert_eq!(lenient.decode(&bytes).unwrap(), Value::Array(vec![true.into(); 3]));
        let err = strict.decode(&bytes).unwrap_err();
        assert!(matches!(
            err.root_cause(),
            DecodeError::LengthLimit { count: 3, max: 2, .. }
        ));
    }

    #[test]
    fn test_protocol_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Protocol>();
    }
}
