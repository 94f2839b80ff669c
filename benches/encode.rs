use criterion::{black_box, criterion_group, criterion_main, Criterion};
use qrsvg::qrcode::{build_data_codewords, build_skeleton, penalty_score, QrEncoder};
use qrsvg::{encode, encode_symbol};

fn bench_encode_short(c: &mut Criterion) {
    c.bench_function("encode_hello_svg", |b| {
        b.iter(|| encode(black_box("HELLO"), black_box(200)))
    });
}

fn bench_encode_full(c: &mut Criterion) {
    let text = "x".repeat(106);
    c.bench_function("encode_full_capacity_svg", |b| {
        b.iter(|| encode(black_box(&text), black_box(200)))
    });
}

fn bench_symbol_only(c: &mut Criterion) {
    let encoder = QrEncoder::new();
    c.bench_function("encode_symbol_owned_encoder", |b| {
        b.iter(|| encoder.encode_text(black_box("https://example.com/events/42")))
    });
}

fn bench_stages(c: &mut Criterion) {
    c.bench_function("build_data_codewords", |b| {
        b.iter(|| build_data_codewords(black_box(b"https://example.com/events/42")))
    });
    c.bench_function("build_skeleton", |b| b.iter(build_skeleton));

    let qr = encode_symbol("https://example.com/events/42").unwrap();
    c.bench_function("penalty_score", |b| b.iter(|| penalty_score(black_box(qr.grid()))));
}

criterion_group!(
    benches,
    bench_encode_short,
    bench_encode_full,
    bench_symbol_only,
    bench_stages
);
criterion_main!(benches);
