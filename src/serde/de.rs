//! Deserializer reading Rust types out of a borrowed [`Value`].

use std::collections::HashMap;

use serde::de::{self, DeserializeSeed, IntoDeserializer, Visitor};

use super::error::SerdeError;
use crate::value::{BigInt, Value};

pub struct ValueDeserializer<'de> {
    value: &'de Value,
}

impl<'de> ValueDeserializer<'de> {
    pub fn new(value: &'de Value) -> Self {
        ValueDeserializer { value }
    }

    pub fn deserialize<T: de::Deserialize<'de>>(value: &'de Value) -> Result<T, SerdeError> {
        T::deserialize(ValueDeserializer::new(value))
    }

    fn out_of_range(n: BigInt) -> SerdeError {
        SerdeError::Custom(format!("bigint {n} does not fit a 128-bit integer"))
    }

    fn mismatch(&self, expected: &'static str) -> SerdeError {
        SerdeError::TypeMismatch {
            expected,
            actual: self.value.type_name().into(),
        }
    }
}

/// Hand `Value::Json` payloads to serde_json's own deserializer.
macro_rules! forward_json {
    ($self:ident, $method:ident ( $($arg:expr),* )) => {
        if let Value::Json(json) = $self.value {
            return de::Deserializer::$method(json, $($arg),*).map_err(SerdeError::from);
        }
    };
}

impl<'de> de::Deserializer<'de> for ValueDeserializer<'de> {
    type Error = SerdeError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.value {
            Value::Undefined => visitor.visit_unit(),
            Value::Boolean(v) => visitor.visit_bool(*v),
            Value::Integer(v) => visitor.visit_i64(*v),
            Value::BigInt(n) => match (n.to_i128(), n.to_u128()) {
                (Some(v), _) => visitor.visit_i128(v),
                (None, Some(v)) => visitor.visit_u128(v),
                _ => Err(Self::out_of_range(*n)),
            },
            Value::Str(v) => visitor.visit_borrowed_str(v),
            Value::Buffer(v) => visitor.visit_borrowed_bytes(v),
            Value::Array(_) => self.deserialize_seq(visitor),
            Value::Object(_) => self.deserialize_map(visitor),
            Value::Json(json) => {
                de::Deserializer::deserialize_any(json, visitor).map_err(SerdeError::from)
            }
        }
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        forward_json!(self, deserialize_bool(visitor));
        match self.value {
            Value::Boolean(v) => visitor.visit_bool(*v),
            _ => Err(self.mismatch("boolean")),
        }
    }

    fn deserialize_i8<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_i64(visitor)
    }

    fn deserialize_i16<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_i64(visitor)
    }

    fn deserialize_i32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_i64(visitor)
    }

    fn deserialize_i64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        forward_json!(self, deserialize_i64(visitor));
        match self.value {
            Value::Integer(v) => visitor.visit_i64(*v),
            Value::BigInt(n) => match n.to_i64() {
                Some(v) => visitor.visit_i64(v),
                None => self.deserialize_i128(visitor),
            },
            _ => Err(self.mismatch("integer")),
        }
    }

    fn deserialize_i128<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        forward_json!(self, deserialize_i128(visitor));
        match self.value {
            Value::Integer(v) => visitor.visit_i128(i128::from(*v)),
            // magnitudes past i128 reach the visitor as u128 so it can report them
            Value::BigInt(n) => match (n.to_i128(), n.to_u128()) {
                (Some(v), _) => visitor.visit_i128(v),
                (None, Some(v)) => visitor.visit_u128(v),
                _ => Err(Self::out_of_range(*n)),
            },
            _ => Err(self.mismatch("integer")),
        }
    }

    fn deserialize_u8<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_u64(visitor)
    }

    fn deserialize_u16<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_u64(visitor)
    }

    fn deserialize_u32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_u64(visitor)
    }

    fn deserialize_u64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        forward_json!(self, deserialize_u64(visitor));
        match self.value {
            // negative values reach the visitor so it can report them
            Value::Integer(v) if *v < 0 => visitor.visit_i64(*v),
            Value::Integer(v) => visitor.visit_u64(*v as u64),
            Value::BigInt(n) => match n.to_u64() {
                Some(v) => visitor.visit_u64(v),
                None => self.deserialize_u128(visitor),
            },
            _ => Err(self.mismatch("integer")),
        }
    }

    fn deserialize_u128<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        forward_json!(self, deserialize_u128(visitor));
        let n = match self.value {
            Value::Integer(v) => BigInt::from(*v),
            Value::BigInt(n) => *n,
            _ => return Err(self.mismatch("integer")),
        };
        match (n.to_u128(), n.to_i128()) {
            (Some(v), _) => visitor.visit_u128(v),
            (None, Some(v)) => visitor.visit_i128(v),
            _ => Err(Self::out_of_range(n)),
        }
    }

    fn deserialize_f32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_f64(visitor)
    }

    fn deserialize_f64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        // only JSON payloads carry fractional numbers
        forward_json!(self, deserialize_f64(visitor));
        Err(SerdeError::UnsupportedType("floating point numbers".into()))
    }

    fn deserialize_char<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        forward_json!(self, deserialize_char(visitor));
        match self.value {
            Value::Str(s) => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => visitor.visit_char(c),
                    _ => Err(SerdeError::TypeMismatch {
                        expected: "single character",
                        actual: format!("string of length {}", s.len()),
                    }),
                }
            }
            _ => Err(self.mismatch("char")),
        }
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        forward_json!(self, deserialize_str(visitor));
        match self.value {
            Value::Str(s) => visitor.visit_borrowed_str(s),
            _ => Err(self.mismatch("string")),
        }
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_str(visitor)
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        forward_json!(self, deserialize_bytes(visitor));
        match self.value {
            Value::Buffer(b) => visitor.visit_borrowed_bytes(b),
            _ => Err(self.mismatch("buffer")),
        }
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_bytes(visitor)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        forward_json!(self, deserialize_option(visitor));
        match self.value {
            Value::Undefined => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        forward_json!(self, deserialize_unit(visitor));
        match self.value {
            Value::Undefined => visitor.visit_unit(),
            _ => Err(self.mismatch("undefined")),
        }
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        forward_json!(self, deserialize_seq(visitor));
        match self.value {
            Value::Array(items) => visitor.visit_seq(SeqAccess { iter: items.iter() }),
            _ => Err(self.mismatch("array")),
        }
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        forward_json!(self, deserialize_map(visitor));
        match self.value {
            Value::Object(map) => visitor.visit_map(MapAccess::new(map)),
            _ => Err(self.mismatch("object")),
        }
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_map(visitor)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        forward_json!(self, deserialize_enum(name, variants, visitor));
        match self.value {
            Value::Integer(v) => {
                let index = u32::try_from(*v)
                    .map_err(|_| SerdeError::Custom(format!("invalid variant index {v}")))?;
                visitor.visit_enum(index.into_deserializer())
            }
            Value::Str(s) => visitor.visit_enum(s.as_str().into_deserializer()),
            _ => Err(self.mismatch("enum variant index or name")),
        }
    }

    fn deserialize_identifier<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_str(visitor)
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_unit()
    }
}

struct SeqAccess<'de> {
    iter: std::slice::Iter<'de, Value>,
}

impl<'de> de::SeqAccess<'de> for SeqAccess<'de> {
    type Error = SerdeError;

    fn next_element_seed<T: DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> Result<Option<T::Value>, Self::Error> {
        match self.iter.next() {
            Some(value) => seed.deserialize(ValueDeserializer::new(value)).map(Some),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

struct MapAccess<'de> {
    iter: std::collections::hash_map::Iter<'de, String, Value>,
    current_value: Option<&'de Value>,
}

impl<'de> MapAccess<'de> {
    fn new(map: &'de HashMap<String, Value>) -> Self {
        MapAccess {
            iter: map.iter(),
            current_value: None,
        }
    }
}

impl<'de> de::MapAccess<'de> for MapAccess<'de> {
    type Error = SerdeError;

    fn next_key_seed<K: DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> Result<Option<K::Value>, Self::Error> {
        match self.iter.next() {
            Some((key, value)) => {
                self.current_value = Some(value);
                let key: de::value::BorrowedStrDeserializer<'de, SerdeError> =
                    de::value::BorrowedStrDeserializer::new(key);
                seed.deserialize(key).map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(
        &mut self,
        seed: V,
    ) -> Result<V::Value, Self::Error> {
        let value = self.current_value.take().ok_or_else(|| {
            SerdeError::Custom("next_value_seed called before next_key_seed".into())
        })?;
        seed.deserialize(ValueDeserializer::new(value))
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}
