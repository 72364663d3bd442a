//! Benchmarks for the DFF decoder
//!
//! Run with: cargo bench --features fixtures

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;

use dffkit_core::{Vec2, Vec3};
use dffkit_parsers::dff::fixtures::{simple_geometry, DffBuilder};
use dffkit_parsers::{DffParser, ParseOptions, Triangle};

/// Flat `side`×`side` vertex grid with UVs and normals
fn grid_model(side: u16) -> Vec<u8> {
    let mut vertices = Vec::new();
    let mut uvs = Vec::new();
    for y in 0..side {
        for x in 0..side {
            vertices.push(Vec3::new(f32::from(x), f32::from(y), 0.0));
            uvs.push(Vec2::new(f32::from(x) / f32::from(side), f32::from(y) / f32::from(side)));
        }
    }

    let mut triangles = Vec::new();
    for y in 0..side - 1 {
        for x in 0..side - 1 {
            let i = y * side + x;
            triangles.push(Triangle::new(i, i + 1, i + side, 0));
            triangles.push(Triangle::new(i + 1, i + side + 1, i + side, 0));
        }
    }

    let mut geometry = simple_geometry(vertices, triangles);
    geometry.normals = Some(vec![Vec3::Z; geometry.vertices.len()]);
    geometry.uv_layers = vec![uvs];

    DffBuilder::new()
        .named_frame("root", -1, Vec3::ZERO)
        .named_frame("grid", 0, Vec3::ZERO)
        .geometry(geometry)
        .atomic(1, 0)
        .build()
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("dff_decode");
    let parser = DffParser::new();
    let options = ParseOptions::default();

    for side in [16u16, 64, 128] {
        let bytes = grid_model(side);
        group.throughput(Throughput::Bytes(bytes.len() as u64));
        group.bench_with_input(BenchmarkId::new("grid", side), &bytes, |b, bytes| {
            b.iter(|| parser.parse_bytes(black_box(bytes), &options, None))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_decode);
criterion_main!(benches);
