use criterion::{criterion_group, criterion_main, Criterion};
use netdiag::checksum::internet_checksum;
use netdiag::dns::{decode_response, encode_query, RecordType};
use std::hint::black_box;

/// Response to an A query for example.com with `answers` compressed records
fn synthetic_response(answers: u16) -> Vec<u8> {
    let mut message = encode_query("example.com", RecordType::A, 0x4242).unwrap();
    message[2] |= 0x80;
    message[6..8].copy_from_slice(&answers.to_be_bytes());
    for i in 0..answers {
        message.extend_from_slice(&[0xC0, 0x0C, 0, 1, 0, 1, 0, 0, 1, 0x2c, 0, 4]);
        message.extend_from_slice(&[192, 0, (i >> 8) as u8, i as u8]);
    }
    message
}

fn benchmark_encode_query(c: &mut Criterion) {
    c.bench_function("encode_query", |b| {
        b.iter(|| encode_query(black_box("www.example.co.uk"), RecordType::AAAA, 7))
    });
}

fn benchmark_decode_response(c: &mut Criterion) {
    let small = synthetic_response(1);
    let large = synthetic_response(32);

    c.bench_function("decode_response_1_answer", |b| {
        b.iter(|| decode_response(black_box(&small), "example.com"))
    });
    c.bench_function("decode_response_32_answers", |b| {
        b.iter(|| decode_response(black_box(&large), "example.com"))
    });
}

fn benchmark_checksum(c: &mut Criterion) {
    let packet = vec![0xabu8; 64];
    c.bench_function("internet_checksum_64", |b| {
        b.iter(|| internet_checksum(black_box(&packet)))
    });
}

criterion_group!(
    benches,
    benchmark_encode_query,
    benchmark_decode_response,
    benchmark_checksum
);
criterion_main!(benches);
