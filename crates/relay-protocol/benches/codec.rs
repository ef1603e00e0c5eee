//! Codec benchmarks for relay-protocol.

use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use relay_protocol::{codec, Envelope};

fn bench_encode_small(c: &mut Criterion) {
    let envelope = Envelope::message("x".repeat(64), Utc::now());

    let mut group = c.benchmark_group("encode");
    group.throughput(Throughput::Bytes(64));
    group.bench_function("small_64B", |b| {
        b.iter(|| codec::encode(black_box(&envelope)))
    });
    group.finish();
}

fn bench_decode_small(c: &mut Criterion) {
    let text = format!(r#"{{"message":"{}"}}"#, "x".repeat(64));

    let mut group = c.benchmark_group("decode");
    group.throughput(Throughput::Bytes(text.len() as u64));
    group.bench_function("small_64B", |b| {
        b.iter(|| codec::decode_inbound(black_box(&text)))
    });
    group.finish();
}

criterion_group!(benches, bench_encode_small, bench_decode_small);
criterion_main!(benches);
