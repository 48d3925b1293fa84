use criterion::{black_box, criterion_group, criterion_main, Criterion};
use maptrace::{codec, shortest_path, GridGraph, PathFinderState, PixelGrid, Point};

const FORBIDDEN: [u8; 3] = [0, 0, 0];

/// A deterministic open field with broken walls, so the tracer has to route
/// around obstacles instead of walking the diagonal.
fn build_grid(side: usize) -> PixelGrid {
    let mut data = vec![0u8; side * side * 3];
    for y in 0..side {
        for x in 0..side {
            let p = (y * side + x) * 3;
            let wall = x % 16 == 7 && y % 11 != 0;
            let shade = if wall {
                0
            } else {
                64 + ((x * 7 + y * 13) % 128) as u8
            };
            data[p] = shade;
            data[p + 1] = shade;
            data[p + 2] = shade;
        }
    }
    PixelGrid::new(data, side, side, false).unwrap()
}

fn build_graph(side: usize) -> GridGraph {
    GridGraph::from_pixels(&build_grid(side), FORBIDDEN)
}

fn bench_construction(c: &mut Criterion) {
    for side in [64, 128, 256] {
        let grid = build_grid(side);
        c.bench_function(&format!("from_pixels_{}", side), |b| {
            b.iter(|| GridGraph::from_pixels(black_box(&grid), black_box(FORBIDDEN)))
        });
    }
}

fn bench_codec(c: &mut Criterion) {
    for side in [64, 128] {
        let graph = build_graph(side);
        let mut bytes = Vec::new();
        codec::encode_map(&graph, &mut bytes).unwrap();

        c.bench_function(&format!("encode_map_{}", side), |b| {
            b.iter(|| {
                let mut out = Vec::with_capacity(bytes.len());
                codec::encode_map(black_box(&graph), &mut out).unwrap();
                out
            })
        });

        c.bench_function(&format!("decode_map_{}", side), |b| {
            b.iter(|| codec::decode_map(black_box(&bytes)).unwrap())
        });
    }
}

fn bench_shortest_path(c: &mut Criterion) {
    for side in [64, 128, 256] {
        let graph = build_graph(side);
        let start = Point { x: 0, y: 0 };
        let goal = Point {
            x: side - 1,
            y: side - 1,
        };

        c.bench_function(&format!("shortest_path_{}", side), |b| {
            b.iter(|| {
                let state =
                    shortest_path(black_box(&graph), black_box(start), black_box(goal)).unwrap();
                assert!(matches!(state, PathFinderState::PathFound(_)));
            })
        });
    }
}

criterion_group!(benches, bench_construction, bench_codec, bench_shortest_path);
criterion_main!(benches);
