//! Tests for the schema-less codec.

use pretty_assertions::assert_eq;
use serde_json::json;
use simple_protocol::buffer::{Reader, Writer};
use simple_protocol::error::{DecodeError, EncodeError};
use simple_protocol::tagged::{deserialize_from, serialize_into, WireTag};
use simple_protocol::{deserialize, serialize, BigInt, Value};

fn mixed() -> Vec<Value> {
    vec![
        "hello".into(),
        b"world".to_vec().into(),
        8i64.into(),
        65535i64.into(),
        4294967295i64.into(),
        json!({"hello": "world"}).into(),
        15779779462787834424u128.into(),
    ]
}

#[test]
fn test_serialize_and_deserialize() {
    let mut data = mixed();
    data.push(Value::Array(mixed()));
    data.push(Value::Undefined);
    let data = Value::Array(data);

    let bytes = serialize(&data).unwrap();
    assert_eq!(bytes[0], WireTag::Array as u8);
    assert_eq!(deserialize(&bytes).unwrap(), data);
}

#[test]
fn test_scalars() {
    let values: Vec<Value> = vec![
        true.into(),
        false.into(),
        i32::MIN.into(),
        (-1i64).into(),
        i128::MIN.into(),
        i128::MAX.into(),
        (1u128 << 127).into(),
        u128::MAX.into(),
        Value::BigInt(BigInt::new(true, u128::MAX)),
        "".into(),
        Vec::<u8>::new().into(),
        Value::Array(vec![]),
        json!([1, "two", null]).into(),
    ];
    for value in values {
        let bytes = serialize(&value).unwrap();
        assert_eq!(deserialize(&bytes).unwrap(), value);
    }
}

#[test]
fn test_object_travels_as_json() {
    let value = Value::from_fields(vec![
        ("a", 1i64.into()),
        ("b", "x".into()),
        ("nested", Value::from_fields(vec![("list", Value::Array(vec![true.into()]))])),
    ]);
    let bytes = serialize(&value).unwrap();
    assert_eq!(bytes[0], WireTag::JsonObject as u8);

    let decoded = deserialize(&bytes).unwrap();
    assert!(matches!(decoded, Value::Object(_)));
    assert_eq!(decoded, value);
    assert_eq!(
        decoded,
        Value::Json(json!({"a": 1, "b": "x", "nested": {"list": [true]}}))
    );

    let opaque = Value::from_fields(vec![("raw", vec![1u8, 2].into())]);
    assert!(matches!(serialize(&opaque), Err(EncodeError::Unsupported(_))));
}

#[test]
fn test_json_object_decodes_as_object() {
    let bytes = serialize(&json!({"hello": "world", "n": 5}).into()).unwrap();
    let decoded = deserialize(&bytes).unwrap();
    assert_eq!(decoded.get("hello"), Some(&Value::from("world")));
    assert_eq!(decoded.get("n"), Some(&Value::Integer(5)));
    assert_eq!(serialize(&decoded).unwrap(), bytes);
}

#[test]
fn test_consecutive_values_share_a_buffer() {
    let mut writer = Writer::new();
    serialize_into(&mut writer, &"first".into()).unwrap();
    serialize_into(&mut writer, &42i64.into()).unwrap();
    let bytes = writer.dump();

    let mut reader = Reader::new(&bytes);
    assert_eq!(deserialize_from(&mut reader).unwrap(), Value::from("first"));
    assert_eq!(deserialize_from(&mut reader).unwrap(), Value::Integer(42));
    assert!(reader.is_exhausted());

    assert!(matches!(
        deserialize(&bytes),
        Err(DecodeError::TrailingBytes { remaining: 5 })
    ));
}

#[test]
fn test_unknown_tag_rejected() {
    assert!(matches!(
        deserialize(&[200]),
        Err(DecodeError::UnknownWireTag { tag: 200, offset: 0 })
    ));
    assert!(matches!(
        deserialize(&[WireTag::Union as u8, 0]),
        Err(DecodeError::UnknownWireTag { tag: 8, .. })
    ));
}

#[test]
fn test_truncated_input() {
    let bytes = serialize(&Value::Array(mixed())).unwrap();
    for cut in 0..bytes.len() {
        assert!(deserialize(&bytes[..cut]).is_err(), "cut at {cut} decoded");
    }
}

#[test]
fn test_depth_limit() {
    let mut bytes = Vec::new();
    for _ in 0..10_000 {
        bytes.extend_from_slice(&[WireTag::Array as u8, 1]);
    }
    bytes.push(WireTag::Undefined as u8);
    assert!(matches!(deserialize(&bytes), Err(DecodeError::DepthLimit(_))));
}
