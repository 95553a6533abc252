// Graph construction and analysis benchmarks
// Overlap graph construction, backbone extraction and molecule separation on a tiled genome

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use physlr::core::minimizer_index::MinimizerIndex;
use physlr::graph::backbone::determine_backbones;
use physlr::graph::molecules::{count_molecules, partition_all};
use physlr::graph::overlap_graph::{OverlapConfig, OverlapGraphBuilder};
use physlr::BarcodeGraph;
use std::sync::Arc;
use std::time::Duration;

/// Barcodes tile a linear genome with a fixed stride; each holds `window` markers
fn tiled_index(barcodes: usize, window: u64, stride: u64) -> MinimizerIndex {
    let mut index = MinimizerIndex::new();
    for i in 0..barcodes as u64 {
        let start = i * stride;
        index.insert(&format!("bx{i:06}"), start..start + window);
    }
    index
}

fn tiled_graph(barcodes: usize) -> BarcodeGraph {
    let builder = OverlapGraphBuilder::new(OverlapConfig::default()).expect("valid config");
    let (graph, _) = builder
        .build(tiled_index(barcodes, 40, 5))
        .expect("overlap graph");
    graph
}

fn bench_overlap_construction(c: &mut Criterion) {
    let mut group = c.benchmark_group("overlap_construction");
    group.sample_size(20);
    group.measurement_time(Duration::from_secs(10));

    for barcodes in [500, 2000, 5000] {
        group.throughput(Throughput::Elements(barcodes as u64));
        group.bench_with_input(BenchmarkId::from_parameter(barcodes), &barcodes, |b, &barcodes| {
            let builder = OverlapGraphBuilder::new(OverlapConfig::default()).expect("valid config");
            b.iter_with_setup(
                || tiled_index(barcodes, 40, 5),
                |index| black_box(builder.build(index).expect("overlap graph")),
            );
        });
    }
    group.finish();
}

fn bench_backbones(c: &mut Criterion) {
    let mut group = c.benchmark_group("backbones");
    group.sample_size(20);

    for barcodes in [500, 2000] {
        let graph = tiled_graph(barcodes);
        group.bench_with_input(BenchmarkId::from_parameter(barcodes), &graph, |b, graph| {
            b.iter(|| black_box(determine_backbones(graph)));
        });
    }
    group.finish();
}

fn bench_molecules(c: &mut Criterion) {
    let mut group = c.benchmark_group("molecules");
    group.sample_size(10);

    let graph = Arc::new(tiled_graph(1000));
    for threads in [1, 4] {
        group.bench_with_input(BenchmarkId::new("partition", threads), &threads, |b, &threads| {
            b.iter(|| black_box(partition_all(Arc::clone(&graph), threads).expect("partition")));
        });
    }
    for threads in [1, 4] {
        group.bench_with_input(BenchmarkId::new("count", threads), &threads, |b, &threads| {
            b.iter_with_setup(
                || (*graph).clone(),
                |mut g| {
                    count_molecules(&mut g, threads).expect("count");
                    black_box(g)
                },
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_overlap_construction, bench_backbones, bench_molecules);
criterion_main!(benches);
