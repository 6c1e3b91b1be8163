//! Serde integration.
//!
//! Converts types deriving `Serialize`/`Deserialize` to and from [`Value`],
//! and through a compiled [`Protocol`] to and from bytes.
//!
//! Mapping: integers up to 64 bits become `Integer` (a `u64` above
//! `i64::MAX` becomes `BigInt`), all of `i128` and `u128` become `BigInt`, `None`
//! and `()` become `Undefined` (and drop out of structs), byte buffers
//! (`serde_bytes`) become `Buffer`, structs and string-keyed maps become
//! `Object`. Floats are not supported.
//!
//! # Example
//!
//! ```rust
//! use serde::{Deserialize, Serialize};
//! use simple_protocol::{Protocol, SchemaNode};
//!
//! #[derive(Serialize, Deserialize, Debug, PartialEq)]
//! struct Person {
//!     name: String,
//!     age: u8,
//! }
//!
//! let protocol = Protocol::compile(SchemaNode::object("Person", vec![
//!     SchemaNode::string("name"),
//!     SchemaNode::uint8("age"),
//! ])).unwrap();
//!
//! let person = Person { name: "Alice".into(), age: 30 };
//! let bytes = simple_protocol::serde::to_bytes(&protocol, &person).unwrap();
//! let decoded: Person = simple_protocol::serde::from_bytes(&protocol, &bytes).unwrap();
//! assert_eq!(person, decoded);
//! ```

mod de;
mod error;
mod ser;

pub use error::SerdeError;

use serde::{Deserialize, Serialize};

use crate::codec::Protocol;
use crate::value::Value;

/// Serialize `value` and encode it with `protocol`.
pub fn to_bytes<T: ?Sized + Serialize>(protocol: &Protocol, value: &T) -> Result<Vec<u8>, SerdeError> {
    let value = ser::ValueSerializer::serialize(value)?;
    Ok(protocol.encode(&value)?)
}

/// Decode `bytes` with `protocol` and deserialize the result.
pub fn from_bytes<T: for<'de> Deserialize<'de>>(
    protocol: &Protocol,
    bytes: &[u8],
) -> Result<T, SerdeError> {
    let value = protocol.decode(bytes)?;
    de::ValueDeserializer::deserialize(&value)
}

pub fn to_value<T: ?Sized + Serialize>(value: &T) -> Result<Value, SerdeError> {
    ser::ValueSerializer::serialize(value)
}

pub fn from_value<'de, T: Deserialize<'de>>(value: &'de Value) -> Result<T, SerdeError> {
    de::ValueDeserializer::deserialize(value)
}
