use criterion::{Criterion, black_box, criterion_group, criterion_main};

use strata_core::bounds::BoundingBox;
use strata_core::math::Vec3;
use strata_core::mesh::{IndexFormat, encode_indices_u16, encode_indices_u32};

// ---------------------------------------------------------------------------
// Index decoding
// ---------------------------------------------------------------------------

fn bench_decode_u16(c: &mut Criterion) {
    let indices: Vec<u16> = (0..65_535u16).collect();
    let bytes = encode_indices_u16(&indices);
    c.bench_function("decode_indices_u16_64k", |b| {
        b.iter(|| IndexFormat::Uint16.decode(black_box(&bytes)));
    });
}

fn bench_decode_u32(c: &mut Criterion) {
    let indices: Vec<u32> = (0..262_144u32).collect();
    let bytes = encode_indices_u32(&indices);
    c.bench_function("decode_indices_u32_256k", |b| {
        b.iter(|| IndexFormat::Uint32.decode(black_box(&bytes)));
    });
}

// ---------------------------------------------------------------------------
// Bounds
// ---------------------------------------------------------------------------

fn bench_bounds_from_points(c: &mut Criterion) {
    let points: Vec<Vec3> = (0..10_000)
        .map(|i| {
            let t = i as f32 * 0.01;
            Vec3::new(t.sin() * 5.0, t.cos() * 3.0, t)
        })
        .collect();
    c.bench_function("bounds_from_10k_points", |b| {
        b.iter(|| BoundingBox::from_points(black_box(&points).iter().copied()));
    });
}

criterion_group!(
    benches,
    bench_decode_u16,
    bench_decode_u32,
    bench_bounds_from_points,
);
criterion_main!(benches);
