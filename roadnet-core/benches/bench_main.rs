use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use geo::Point;
use roadnet_core::prelude::*;

const SIZE: usize = 40;
const LON0: f64 = -123.20;
const LAT0: f64 = 49.20;
const STEP: f64 = 0.002;

fn vertex(col: usize, row: usize) -> [f64; 2] {
    [LON0 + col as f64 * STEP, LAT0 + row as f64 * STEP * 0.7]
}

fn grid_segments() -> Vec<RawSegment> {
    let mut segments = Vec::with_capacity(2 * SIZE * SIZE);
    for row in 0..SIZE {
        for col in 0..SIZE {
            let class = if row % 10 == 0 || col % 10 == 0 { "Arterial" } else { "Local" };
            let mut neighbours = Vec::new();
            if col + 1 < SIZE {
                neighbours.push((format!("h-{row}-{col}"), vertex(col + 1, row)));
            }
            if row + 1 < SIZE {
                neighbours.push((format!("v-{row}-{col}"), vertex(col, row + 1)));
            }
            for (id, end) in neighbours {
                segments.push(RawSegment {
                    segment_id: id,
                    geometry: Some(vec![vertex(col, row), end]),
                    road_class: Some(class.to_string()),
                    ..RawSegment::default()
                });
            }
        }
    }
    segments
}

fn queries(count: usize) -> Vec<RouteQuery> {
    (0..count)
        .map(|i| {
            let a = vertex(i % SIZE, (i * 7) % SIZE);
            let b = vertex((i * 13) % SIZE, (i * 3 + 5) % SIZE);
            RouteQuery::new(
                format!("q{i}"),
                Point::new(a[0], a[1]),
                Point::new(b[0], b[1]),
            )
        })
        .collect()
}

fn bench_build(c: &mut Criterion) {
    let config = PipelineConfig::default();
    c.bench_function("build_grid_graph", |b| {
        b.iter(|| build_road_graph(black_box(grid_segments()), &config))
    });
}

fn bench_audit(c: &mut Criterion) {
    let config = PipelineConfig::default();
    let (graph, _) = build_road_graph(grid_segments(), &config).expect("valid config");

    let mut group = c.benchmark_group("route_audit");
    for count in [10, 100] {
        let batch = queries(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &batch, |b, batch| {
            b.iter(|| audit_routes(&graph, black_box(batch), &config.audit));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_build, bench_audit);
criterion_main!(benches);
