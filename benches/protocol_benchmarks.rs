use atvremote::der::cert::build_self_signed_certificate;
use atvremote::pairing::secret::compute_checked_secret;
use atvremote::wire::{extract_message, frame_message, Encoder};
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use rsa::RsaPrivateKey;

fn wire_encode_benchmark(c: &mut Criterion) {
    c.bench_function("wire_encode_remote_key_inject", |b| {
        b.iter(|| {
            let mut payload = Encoder::new();
            payload.add_varint(1, black_box(19)).add_varint(2, 3);
            let mut envelope = Encoder::new();
            envelope.add_message(2, &payload);
            black_box(envelope.into_bytes())
        })
    });
}

fn wire_extract_message_benchmark(c: &mut Criterion) {
    let mut payload = Encoder::new();
    payload.add_varint(1, 19).add_varint(2, 3);
    let mut envelope = Encoder::new();
    envelope.add_message(2, &payload);
    let framed = frame_message(&envelope.into_bytes());

    let mut group = c.benchmark_group("wire_extract_message");
    group.throughput(Throughput::Bytes(framed.len() as u64));
    group.bench_function("single_frame", |b| {
        b.iter(|| {
            let mut buf = framed.clone();
            black_box(extract_message(&mut buf))
        })
    });
    group.finish();
}

fn certificate_build_benchmark(c: &mut Criterion) {
    let mut rng = rand::rngs::OsRng;
    let key = RsaPrivateKey::new(&mut rng, 2048).expect("key generation");

    c.bench_function("build_self_signed_certificate", |b| {
        b.iter(|| black_box(build_self_signed_certificate(black_box(&key), 1_700_000_000)).unwrap())
    });
}

fn pairing_secret_benchmark(c: &mut Criterion) {
    let client_mod = [0xAB; 256];
    let client_exp = [0x01, 0x00, 0x01];
    let server_mod = [0xCD; 256];
    let server_exp = [0x01, 0x00, 0x01];
    let code_bytes = [0xAB, 0x00];

    c.bench_function("pairing_secret_derivation", |b| {
        b.iter(|| {
            let _ = compute_checked_secret(
                black_box(&client_mod),
                black_box(&client_exp),
                black_box(&server_mod),
                black_box(&server_exp),
                black_box(&code_bytes),
            );
        })
    });
}

criterion_group!(
    benches,
    wire_encode_benchmark,
    wire_extract_message_benchmark,
    certificate_build_benchmark,
    pairing_secret_benchmark
);
criterion_main!(benches);
