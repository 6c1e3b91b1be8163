use std::collections::HashMap;

use super::ProtocolOptions;
use crate::buffer::Reader;
use crate::error::DecodeError;
use crate::schema::{Kind, SchemaNode};
use crate::value::Value;

/// A read step compiled for one schema node.
pub(crate) type ReadStep =
    Box<dyn Fn(&mut Reader<'_>) -> Result<Value, DecodeError> + Send + Sync>;

struct FieldReader {
    name: String,
    optional: bool,
    step: ReadStep,
}

/// Step for a leaf kind: run the reader call and tag failures with the field.
fn leaf_step<F>(name: String, kind: &'static str, read: F) -> ReadStep
where
    F: Fn(&mut Reader<'_>) -> Result<Value, DecodeError> + Send + Sync + 'static,
{
    Box::new(move |reader: &mut Reader<'_>| read(reader).map_err(|e| e.in_field(&name, kind)))
}

/// Compile the read step for `node` and everything below it.
///
/// Expects a declaration already accepted by the write-side compiler.
pub(crate) fn compile_reader(node: &SchemaNode, options: &ProtocolOptions) -> ReadStep {
    let name = node.name.clone();
    let kind = node.kind.name();

    match &node.kind {
        Kind::UInt8 => leaf_step(name, kind, |r| r.read_u8().map(Value::from)),
        Kind::UInt16 => leaf_step(name, kind, |r| r.read_u16().map(Value::from)),
        Kind::UInt32 => leaf_step(name, kind, |r| r.read_u32().map(Value::from)),
        Kind::Int32 => leaf_step(name, kind, |r| r.read_i32().map(Value::from)),
        Kind::String => leaf_step(name, kind, |r| r.read_string().map(Value::Str)),
        Kind::Buffer => leaf_step(name, kind, |r| {
            r.read_buffer().map(|b| Value::Buffer(b.to_vec()))
        }),
        Kind::Boolean => leaf_step(name, kind, |r| r.read_bool().map(Value::Boolean)),
        Kind::BigInt => leaf_step(name, kind, |r| r.read_big_int().map(Value::from)),
        Kind::UBigInt => leaf_step(name, kind, |r| r.read_big_uint().map(Value::from)),
        Kind::JsonFallback => leaf_step(name, kind, |r| {
            let bytes = r.read_buffer()?;
            Ok(Value::Json(serde_json::from_slice(bytes)?))
        }),
        Kind::Undefined => Box::new(|_: &mut Reader<'_>| Ok(Value::Undefined)),
        Kind::Array(element) => {
            let min_width = element.kind.min_width();
            let max_len = options.max_array_len as u64;
            let element = compile_reader(element, options);
            Box::new(move |reader: &mut Reader<'_>| {
                let offset = reader.offset();
                let count = reader.read_uint_var().map_err(|e| e.in_field(&name, kind))?;
                // zero-width elements are not bounded by the input size
                if count > max_len {
                    return Err(DecodeError::LengthLimit {
                        offset,
                        count,
                        max: max_len,
                    }
                    .in_field(&name, kind));
                }
                let remaining = reader.remaining() as u64;
                if min_width > 0 && count > remaining / min_width as u64 {
                    return Err(DecodeError::OutOfBounds {
                        offset,
                        need: usize::try_from(count.saturating_mul(min_width as u64))
                            .unwrap_or(usize::MAX),
                        have: reader.remaining(),
                    }
                    .in_field(&name, kind));
                }
                let mut items = Vec::with_capacity(count.min(remaining) as usize);
                for _ in 0..count {
                    items.push(element(reader)?);
                }
                Ok(Value::Array(items))
            })
        }
        Kind::Union(elements) => {
            let steps: Vec<ReadStep> = elements
                .iter()
                .map(|element| compile_reader(element, options))
                .collect();
            Box::new(move |reader: &mut Reader<'_>| {
                let len = usize::from(reader.read_u8().map_err(|e| e.in_field(&name, kind))?);
                if len != steps.len() {
                    return Err(DecodeError::UnionArity {
                        field: name.clone(),
                        expected: steps.len(),
                        actual: len,
                    });
                }
                let mut items = Vec::with_capacity(len);
                for step in &steps {
                    items.push(step(reader)?);
                }
                Ok(Value::Array(items))
            })
        }
        Kind::Object(fields) => {
            let readers: Vec<FieldReader> = fields
                .iter()
                .map(|field| FieldReader {
                    name: field.name.clone(),
                    optional: field.kind == Kind::Undefined,
                    step: compile_reader(field, options),
                })
                .collect();
            let index: HashMap<String, usize> = readers
                .iter()
                .enumerate()
                .map(|(i, field)| (field.name.clone(), i))
                .collect();

            Box::new(move |reader: &mut Reader<'_>| {
                let count = reader.read_u8().map_err(|e| e.in_field(&name, kind))?;
                let mut map = HashMap::with_capacity(usize::from(count));
                for _ in 0..count {
                    let key = reader.read_string().map_err(|e| e.in_field(&name, kind))?;
                    let Some(&i) = index.get(&key) else {
                        return Err(DecodeError::UnknownKey {
                            object: name.clone(),
                            key,
                        });
                    };
                    if map.contains_key(&key) {
                        return Err(DecodeError::DuplicateKey {
                            object: name.clone(),
                            key,
                        });
                    }
                    let value = (readers[i].step)(reader)?;
                    map.insert(key, value);
                }
                if let Some(field) = readers
                    .iter()
                    .find(|f| !f.optional && !map.contains_key(&f.name))
                {
                    return Err(DecodeError::MissingField {
                        object: name.clone(),
                        field: field.name.clone(),
                    });
                }
                Ok(Value::Object(map))
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(node: &SchemaNode, bytes: &[u8]) -> Result<Value, DecodeError> {
        let step = compile_reader(node, &ProtocolOptions::default());
        let mut reader = Reader::new(bytes);
        step(&mut reader)
    }

    #[test]
    fn test_leaf_errors_carry_field() {
        let err = read(&SchemaNode::uint32("counter"), &[0, 1]).unwrap_err();
        match &err {
            DecodeError::InField { field, kind, source } => {
                assert_eq!(field, "counter");
                assert_eq!(*kind, "UInt32");
                assert!(matches!(**source, DecodeError::OutOfBounds { need: 4, have: 2, .. }));
            }
            other => panic!("expected field context, got {other:?}"),
        }
        assert!(err.to_string().contains("counter"));
    }

    #[test]
    fn test_array_count_checked_before_allocating() {
        let node = SchemaNode::array("list", SchemaNode::uint32("item"));
        let mut bytes = crate::varint::encode(1 << 40);
        bytes.extend_from_slice(&[0; 8]);
        let err = read(&node, &bytes).unwrap_err();
        assert!(matches!(err.root_cause(), DecodeError::OutOfBounds { .. }));
    }

    #[test]
    fn test_object_wire_errors() {
        let node = SchemaNode::object("o", vec![SchemaNode::uint8("a"), SchemaNode::undefined("u")]);

        assert!(matches!(
            read(&node, &[1, 1, b'z', 0]),
            Err(DecodeError::UnknownKey { ref key, .. }) if key == "z"
        ));
        assert!(matches!(
            read(&node, &[2, 1, b'a', 0, 1, b'a', 0]),
            Err(DecodeError::DuplicateKey { .. })
        ));
        assert!(matches!(
            read(&node, &[1, 1, b'u']),
            Err(DecodeError::MissingField { ref field, .. }) if field == "a"
        ));
        assert_eq!(
            read(&node, &[1, 1, b'a', 9]).unwrap(),
            Value::from_fields(vec![("a", 9u8.into())])
        );
    }

    #[test]
    fn test_union_arity_checked() {
        let node = SchemaNode::union("pair", vec![SchemaNode::uint8("a"), SchemaNode::uint8("b")]);
        assert!(matches!(
            read(&node, &[3, 1, 2, 3]),
            Err(DecodeError::UnionArity { expected: 2, actual: 3, .. })
        ));
    }

    #[test]
    fn test_ubigint_reads_full_u128() {
        let bytes = crate::varint::encode_big(u128::MAX);
        assert_eq!(read(&SchemaNode::ubigint("n"), &bytes).unwrap(), Value::from(u128::MAX));
    }

    #[test]
    fn test_zero_width_array_is_capped() {
        let node = SchemaNode::array("gaps", SchemaNode::undefined("gap"));
        let options = ProtocolOptions {
            max_array_len: 4,
            ..ProtocolOptions::default()
        };
        let step = compile_reader(&node, &options);

        let bytes = crate::varint::encode(4);
        let value = step(&mut Reader::new(&bytes)).unwrap();
        assert_eq!(value, Value::Array(vec![Value::Undefined; 4]));

        let bytes = crate::varint::encode(u64::MAX);
        let err = step(&mut Reader::new(&bytes)).unwrap_err();
        match &err {
            DecodeError::InField { field, source, .. } => {
                assert_eq!(field, "gaps");
                assert!(matches!(
                    **source,
                    DecodeError::LengthLimit { offset: 0, count: u64::MAX, max: 4 }
                ));
            }
            other => panic!("expected field context, got {other:?}"),
        }
    }
}
