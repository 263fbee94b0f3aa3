//! Benchmarks for graph construction and best-path search.
//!
//! Run with: cargo bench -p redund-planner

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use redund_planner::{ConfigurationGraph, SearchMode, SearchOptions, find_best_path};
use redund_types::{NullLog, SolutionSet};

// =============================================================================
// Instance generation
// =============================================================================

/// `points` points with `per_point` random six-joint configurations each.
fn random_instance(points: usize, per_point: usize, seed: u64) -> SolutionSet {
    let mut rng = StdRng::seed_from_u64(seed);
    SolutionSet::from_nested(
        (0..points)
            .map(|_| {
                (0..per_point)
                    .map(|_| (0..6).map(|_| rng.gen_range(-3.0..3.0)).collect())
                    .collect()
            })
            .collect(),
    )
}

// =============================================================================
// Benchmarks
// =============================================================================

fn bench_graph_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph_build");
    for per_point in [8, 32, 64] {
        let set = random_instance(50, per_point, 1);
        group.throughput(Throughput::Elements((49 * per_point * per_point) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(per_point), &set, |b, set| {
            b.iter(|| ConfigurationGraph::build(black_box(set)));
        });
    }
    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");
    let set = random_instance(30, 16, 2);
    let graph = ConfigurationGraph::build(&set);
    let options = SearchOptions::default();

    group.bench_function("exhaustive", |b| {
        b.iter(|| find_best_path(black_box(&graph), 30, SearchMode::Exhaustive, &options, &NullLog));
    });
    for iterations in [10, 100] {
        let mode = SearchMode::from_iterations(Some(iterations))
            .map(|m| m.with_seed(Some(3)))
            .unwrap_or(SearchMode::Exhaustive);
        group.bench_with_input(BenchmarkId::new("sampling", iterations), &mode, |b, mode| {
            b.iter(|| find_best_path(black_box(&graph), 30, *mode, &options, &NullLog));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_graph_build, bench_search);
criterion_main!(benches);
