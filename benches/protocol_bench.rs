//! Benchmarks for schema-driven and schema-less encode/decode.
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::json;
use simple_protocol::{deserialize, serialize, varint, Protocol, SchemaNode, Value};

// ============================================================================
// Fixtures
// ============================================================================

fn person_schema() -> SchemaNode {
    SchemaNode::object(
        "Person",
        vec![
            SchemaNode::string("name"),
            SchemaNode::uint8("age"),
            SchemaNode::boolean("active"),
        ],
    )
}

fn person() -> Value {
    Value::from_fields(vec![
        ("name", "Alice".into()),
        ("age", 30u8.into()),
        ("active", true.into()),
    ])
}

fn event_schema() -> SchemaNode {
    SchemaNode::union(
        "event",
        vec![
            SchemaNode::string("type"),
            SchemaNode::buffer("payload"),
            SchemaNode::uint32("sequence"),
            SchemaNode::json("meta"),
            SchemaNode::bigint("timestamp"),
        ],
    )
}

fn event() -> Value {
    Value::Array(vec![
        "update".into(),
        vec![7u8; 256].into(),
        4_000_000u32.into(),
        json!({"source": "bench", "retries": 3}).into(),
        Value::from(1_700_000_000_000_000_000i128),
    ])
}

fn numbers(len: usize) -> Value {
    Value::Array((0..len as u32).map(|n| Value::from(n * 7919)).collect())
}

// ============================================================================
// Benchmarks
// ============================================================================

fn bench_varint(c: &mut Criterion) {
    let mut group = c.benchmark_group("varint");
    for n in [1u128, 1 << 20, u64::MAX as u128, u128::MAX] {
        let encoded = varint::encode_big(n);
        group.bench_with_input(BenchmarkId::new("encode", n), &n, |b, &n| {
            b.iter(|| varint::encode_big(black_box(n)))
        });
        group.bench_with_input(BenchmarkId::new("decode", n), &encoded, |b, encoded| {
            b.iter(|| varint::decode_big(black_box(encoded)))
        });
    }
    group.finish();
}

fn bench_protocol(c: &mut Criterion) {
    let cases = [
        ("person", person_schema(), person()),
        ("event", event_schema(), event()),
    ];

    let mut group = c.benchmark_group("protocol");
    for (name, schema, value) in cases {
        let protocol = Protocol::compile(schema).unwrap();
        let encoded = protocol.encode(&value).unwrap();
        group.throughput(Throughput::Bytes(encoded.len() as u64));

        group.bench_function(BenchmarkId::new("encode", name), |b| {
            b.iter(|| protocol.encode(black_box(&value)).unwrap())
        });
        let mut encoder = protocol.encoder();
        group.bench_function(BenchmarkId::new("encoder", name), |b| {
            b.iter(|| encoder.encode(black_box(&value)).unwrap())
        });
        group.bench_function(BenchmarkId::new("decode", name), |b| {
            b.iter(|| protocol.decode(black_box(&encoded)).unwrap())
        });
    }
    group.finish();
}

fn bench_arrays(c: &mut Criterion) {
    let protocol = Protocol::compile(SchemaNode::array("numbers", SchemaNode::uint32("n"))).unwrap();

    let mut group = c.benchmark_group("arrays");
    for len in [16usize, 256, 4096] {
        let value = numbers(len);
        let encoded = protocol.encode(&value).unwrap();
        group.throughput(Throughput::Elements(len as u64));
        group.bench_with_input(BenchmarkId::new("encode", len), &value, |b, value| {
            b.iter(|| protocol.encode(black_box(value)).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("decode", len), &encoded, |b, encoded| {
            b.iter(|| protocol.decode(black_box(encoded)).unwrap())
        });
    }
    group.finish();
}

fn bench_tagged(c: &mut Criterion) {
    let value = Value::Array(vec![event(), numbers(64), Value::Undefined]);
    let encoded = serialize(&value).unwrap();

    let mut group = c.benchmark_group("tagged");
    group.throughput(Throughput::Bytes(encoded.len() as u64));
    group.bench_function("serialize", |b| b.iter(|| serialize(black_box(&value)).unwrap()));
    group.bench_function("deserialize", |b| {
        b.iter(|| deserialize(black_box(&encoded)).unwrap())
    });
    group.finish();
}

criterion_group!(benches, bench_varint, bench_protocol, bench_arrays, bench_tagged);
criterion_main!(benches);
