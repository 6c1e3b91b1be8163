use std::borrow::Cow;
use std::collections::HashSet;

use crate::buffer::Writer;
use crate::error::{EncodeError, SchemaError};
use crate::schema::{Kind, SchemaNode};
use crate::value::Value;

/// A write step compiled for one schema node.
pub(crate) type WriteStep =
    Box<dyn Fn(&mut Writer, &Value) -> Result<(), EncodeError> + Send + Sync>;

/// A compiled object field.
struct FieldWriter {
    name: String,
    optional: bool,
    step: WriteStep,
}

fn mismatch(field: &str, expected: &'static str, value: &Value) -> EncodeError {
    let actual = match value {
        Value::Json(json) => json_type_name(json),
        other => other.type_name(),
    };
    EncodeError::WriteType {
        field: field.to_string(),
        expected,
        actual,
    }
}

pub(crate) fn json_type_name(json: &serde_json::Value) -> &'static str {
    match json {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "json boolean",
        serde_json::Value::Number(_) => "json number",
        serde_json::Value::String(_) => "json string",
        serde_json::Value::Array(_) => "json array",
        serde_json::Value::Object(_) => "json object",
    }
}

/// Step for a fixed-width integer kind: type check, range check, write.
fn integer_step<T>(name: String, kind: &'static str, write: fn(&mut Writer, T)) -> WriteStep
where
    T: TryFrom<i64> + 'static,
{
    Box::new(move |writer: &mut Writer, value: &Value| {
        let n = match value {
            Value::Integer(n) => *n,
            other => return Err(mismatch(&name, kind, other)),
        };
        let n = T::try_from(n).map_err(|_| EncodeError::OutOfRange {
            field: name.clone(),
            kind,
            value: n.to_string(),
        })?;
        write(writer, n);
        Ok(())
    })
}

/// Compile the write step for `node` and everything below it.
///
/// Declaration problems that only show up structurally (oversized objects and
/// unions, duplicate field names) are reported here.
pub(crate) fn compile_writer(node: &SchemaNode) -> Result<WriteStep, SchemaError> {
    let name = node.name.clone();
    let kind = node.kind.name();

    let step: WriteStep = match &node.kind {
        Kind::UInt8 => integer_step(name, kind, Writer::write_u8),
        Kind::UInt16 => integer_step(name, kind, Writer::write_u16),
        Kind::UInt32 => integer_step(name, kind, Writer::write_u32),
        Kind::Int32 => integer_step(name, kind, Writer::write_i32),
        Kind::String => Box::new(move |writer: &mut Writer, value: &Value| match value {
            Value::Str(s) => {
                writer.write_string(s);
                Ok(())
            }
            other => Err(mismatch(&name, kind, other)),
        }),
        Kind::Buffer => Box::new(move |writer: &mut Writer, value: &Value| match value {
            Value::Buffer(b) => {
                writer.write_buffer(b);
                Ok(())
            }
            other => Err(mismatch(&name, kind, other)),
        }),
        Kind::Boolean => Box::new(move |writer: &mut Writer, value: &Value| match value {
            Value::Boolean(b) => {
                writer.write_bool(*b);
                Ok(())
            }
            other => Err(mismatch(&name, kind, other)),
        }),
        Kind::BigInt => Box::new(move |writer: &mut Writer, value: &Value| match value {
            // zigzag keeps the signed kind inside the 128-bit varint domain
            Value::BigInt(n) => {
                let n = n.to_i128().ok_or_else(|| EncodeError::OutOfRange {
                    field: name.clone(),
                    kind,
                    value: n.to_string(),
                })?;
                writer.write_big_int(n);
                Ok(())
            }
            other => Err(mismatch(&name, kind, other)),
        }),
        Kind::UBigInt => Box::new(move |writer: &mut Writer, value: &Value| match value {
            Value::BigInt(n) => {
                let n = n.to_u128().ok_or_else(|| EncodeError::OutOfRange {
                    field: name.clone(),
                    kind,
                    value: n.to_string(),
                })?;
                writer.write_big_uint(n);
                Ok(())
            }
            other => Err(mismatch(&name, kind, other)),
        }),
        Kind::JsonFallback => Box::new(move |writer: &mut Writer, value: &Value| {
            let json = match value {
                Value::Json(json) if json.is_object() || json.is_array() || json.is_null() => {
                    Cow::Borrowed(json)
                }
                Value::Object(_) => Cow::Owned(value.to_json().ok_or_else(|| {
                    EncodeError::Unsupported(format!(
                        "object in field '{name}' holding values with no JSON form"
                    ))
                })?),
                other => return Err(mismatch(&name, kind, other)),
            };
            let text = serde_json::to_string(&*json).map_err(|source| EncodeError::Json {
                field: name.clone(),
                source,
            })?;
            writer.write_string(&text);
            Ok(())
        }),
        Kind::Undefined => Box::new(move |_: &mut Writer, value: &Value| match value {
            Value::Undefined => Ok(()),
            other => Err(mismatch(&name, kind, other)),
        }),
        Kind::Array(element) => {
            let element = compile_writer(element)?;
            Box::new(move |writer: &mut Writer, value: &Value| match value {
                Value::Array(items) => {
                    writer.write_uint_var(items.len() as u64);
                    for item in items {
                        element(writer, item)?;
                    }
                    Ok(())
                }
                other => Err(mismatch(&name, kind, other)),
            })
        }
        Kind::Union(elements) => {
            if elements.len() > usize::from(u8::MAX) {
                return Err(SchemaError::TooManyElements {
                    name,
                    count: elements.len(),
                });
            }
            let steps = elements
                .iter()
                .map(compile_writer)
                .collect::<Result<Vec<_>, _>>()?;
            Box::new(move |writer: &mut Writer, value: &Value| {
                let items = match value {
                    Value::Array(items) => items,
                    other => return Err(mismatch(&name, kind, other)),
                };
                if items.len() != steps.len() {
                    return Err(EncodeError::UnionArity {
                        field: name.clone(),
                        expected: steps.len(),
                        actual: items.len(),
                    });
                }
                writer.write_u8(items.len() as u8);
                for (step, item) in steps.iter().zip(items) {
                    step(writer, item)?;
                }
                Ok(())
            })
        }
        Kind::Object(fields) => {
            if fields.len() > usize::from(u8::MAX) {
                return Err(SchemaError::TooManyFields {
                    name,
                    count: fields.len(),
                });
            }
            let mut known = HashSet::with_capacity(fields.len());
            let mut writers = Vec::with_capacity(fields.len());
            for field in fields {
                if !known.insert(field.name.clone()) {
                    return Err(SchemaError::DuplicateField {
                        name,
                        field: field.name.clone(),
                    });
                }
                writers.push(FieldWriter {
                    name: field.name.clone(),
                    optional: field.kind == Kind::Undefined,
                    step: compile_writer(field)?,
                });
            }
            Box::new(move |writer: &mut Writer, value: &Value| {
                let map = match value {
                    Value::Object(map) => map,
                    other => return Err(mismatch(&name, kind, other)),
                };
                if let Some(key) = map.keys().filter(|k| !known.contains(*k)).min() {
                    return Err(EncodeError::UnknownKey {
                        object: name.clone(),
                        key: key.clone(),
                    });
                }

                let mut present = 0u8;
                for field in &writers {
                    if map.contains_key(&field.name) {
                        present += 1;
                    } else if !field.optional {
                        return Err(EncodeError::MissingField {
                            object: name.clone(),
                            field: field.name.clone(),
                        });
                    }
                }

                writer.write_u8(present);
                for field in &writers {
                    if let Some(v) = map.get(&field.name) {
                        writer.write_string(&field.name);
                        (field.step)(writer, v)?;
                    }
                }
                Ok(())
            })
        }
    };
    Ok(step)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(node: &SchemaNode, value: &Value) -> Result<Vec<u8>, EncodeError> {
        let step = compile_writer(node).unwrap();
        let mut writer = Writer::new();
        step(&mut writer, value)?;
        Ok(writer.dump())
    }

    #[test]
    fn test_scalar_layouts() {
        assert_eq!(write(&SchemaNode::uint8("a"), &255u8.into()).unwrap(), vec![0xFF]);
        assert_eq!(write(&SchemaNode::uint16("a"), &0x0102u16.into()).unwrap(), vec![1, 2]);
        assert_eq!(write(&SchemaNode::uint32("a"), &1u32.into()).unwrap(), vec![0, 0, 0, 1]);
        assert_eq!(write(&SchemaNode::int32("a"), &(-1i32).into()).unwrap(), vec![0xFF; 4]);
        assert_eq!(write(&SchemaNode::boolean("a"), &true.into()).unwrap(), vec![1]);
        assert_eq!(write(&SchemaNode::string("a"), &"hi".into()).unwrap(), vec![2, b'h', b'i']);
        assert_eq!(write(&SchemaNode::bigint("a"), &(-1i128).into()).unwrap(), vec![1]);
        assert_eq!(write(&SchemaNode::ubigint("a"), &1i128.into()).unwrap(), vec![1]);
        assert!(write(&SchemaNode::undefined("a"), &Value::Undefined).unwrap().is_empty());
    }

    #[test]
    fn test_out_of_range() {
        let err = write(&SchemaNode::uint8("small"), &256i64.into()).unwrap_err();
        match err {
            EncodeError::OutOfRange { field, kind, value } => {
                assert_eq!(field, "small");
                assert_eq!(kind, "UInt8");
                assert_eq!(value, "256");
            }
            other => panic!("expected out of range, got {other:?}"),
        }
        assert!(matches!(
            write(&SchemaNode::uint32("a"), &(-1i64).into()),
            Err(EncodeError::OutOfRange { .. })
        ));
        assert!(matches!(
            write(&SchemaNode::ubigint("a"), &(-1i128).into()),
            Err(EncodeError::OutOfRange { .. })
        ));
        match write(&SchemaNode::bigint("signed"), &u128::MAX.into()).unwrap_err() {
            EncodeError::OutOfRange { field, kind, value } => {
                assert_eq!(field, "signed");
                assert_eq!(kind, "BigInt");
                assert_eq!(value, u128::MAX.to_string());
            }
            other => panic!("expected out of range, got {other:?}"),
        }
    }

    #[test]
    fn test_json_accepts_objects_only() {
        let node = SchemaNode::json("meta");
        assert!(write(&node, &serde_json::json!({"a": 1}).into()).is_ok());
        assert!(write(&node, &serde_json::json!(null).into()).is_ok());
        assert_eq!(
            write(&node, &Value::from_fields(vec![("a", 1i64.into())])).unwrap(),
            write(&node, &serde_json::json!({"a": 1}).into()).unwrap()
        );
        assert!(matches!(
            write(&node, &Value::from_fields(vec![("raw", vec![1u8].into())])),
            Err(EncodeError::Unsupported(_))
        ));
        match write(&node, &serde_json::json!(3).into()).unwrap_err() {
            EncodeError::WriteType { actual, expected, .. } => {
                assert_eq!(actual, "json number");
                assert_eq!(expected, "JSONFallback");
            }
            other => panic!("expected type error, got {other:?}"),
        }
    }

    #[test]
    fn test_object_writes_declaration_order() {
        let node = SchemaNode::object(
            "o",
            vec![SchemaNode::uint8("b"), SchemaNode::uint8("a"), SchemaNode::undefined("u")],
        );
        let value = Value::from_fields(vec![("a", 1u8.into()), ("b", 2u8.into())]);
        assert_eq!(write(&node, &value).unwrap(), vec![2, 1, b'b', 2, 1, b'a', 1]);
    }

    #[test]
    fn test_schema_errors() {
        let fields = (0..256).map(|i| SchemaNode::uint8(format!("f{i}"))).collect();
        assert!(matches!(
            compile_writer(&SchemaNode::object("big", fields)),
            Err(SchemaError::TooManyFields { count: 256, .. })
        ));

        let elements = (0..300).map(|i| SchemaNode::uint8(format!("e{i}"))).collect();
        assert!(matches!(
            compile_writer(&SchemaNode::union("wide", elements)),
            Err(SchemaError::TooManyElements { count: 300, .. })
        ));

        let dup = SchemaNode::object("o", vec![SchemaNode::uint8("x"), SchemaNode::string("x")]);
        assert!(matches!(
            compile_writer(&dup),
            Err(SchemaError::DuplicateField { ref field, .. }) if field == "x"
        ));
    }
}
