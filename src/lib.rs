//! simple-protocol: a compact binary serialization engine.
//!
//! Two encodings share one value model and one byte buffer:
//!
//! * schema-driven: a [`SchemaNode`] tree is compiled once into a
//!   [`Protocol`], which encodes and decodes [`Value`]s with no type tags on
//!   the wire
//! * schema-less: [`serialize`]/[`deserialize`] prefix every value with a
//!   one-byte tag so anything can be read back without a declaration
//!
//! Variable-length integers use a bijective prefix varint (see [`varint`]),
//! so every integer has exactly one encoding.
//!
//! # Quick Start
//!
//! ```rust
//! use simple_protocol::{Protocol, SchemaNode, Value};
//!
//! let schema = SchemaNode::object("Person", vec![
//!     SchemaNode::string("name"),
//!     SchemaNode::uint8("age"),
//! ]);
//! let protocol = Protocol::compile(schema).unwrap();
//!
//! let value = Value::from_fields(vec![
//!     ("name", "Alice".into()),
//!     ("age", 30u8.into()),
//! ]);
//!
//! let encoded = protocol.encode(&value).unwrap();
//! let decoded = protocol.decode(&encoded).unwrap();
//! assert_eq!(value, decoded);
//! ```

pub mod buffer;
pub mod codec;
pub mod error;
pub mod schema;
pub mod tagged;
pub mod value;
pub mod varint;

#[cfg(feature = "serde")]
pub mod serde;

pub use buffer::{Endian, Reader, Writer};
pub use codec::{Encoder, Protocol, ProtocolOptions};
pub use error::{DecodeError, EncodeError, Error, Result, SchemaError};
pub use schema::{Kind, SchemaNode};
pub use tagged::{deserialize, serialize};
pub use value::{BigInt, Value};
