//! Benchmarks for operator construction and eigensolving
//!
//! Run with: cargo bench -p gapscan-core

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use gapscan_core::{
    AnnealingHamiltonian, DriverCache, InstanceGenerator, OperatorBuilder, ResourceLimits,
    SpectrumSolver, SpectrumStrategy,
};

/// Kronecker-path construction of the two endpoint Hamiltonians
fn bench_operator_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("operator_build");
    let limits = ResourceLimits::default();

    for n in [4usize, 6, 8, 10] {
        let instance = InstanceGenerator::default().spin_glass(n, 1).unwrap();
        let builder = OperatorBuilder::new(n, &limits).unwrap();

        group.bench_with_input(BenchmarkId::new("driver", n), &builder, |b, builder| {
            b.iter(|| builder.driver().unwrap());
        });
        group.bench_with_input(BenchmarkId::new("problem", n), &instance, |b, inst| {
            b.iter(|| builder.problem(black_box(inst)).unwrap());
        });
    }

    group.finish();
}

/// Full Hamiltonian with and without a shared driver
fn bench_driver_cache(c: &mut Criterion) {
    let mut group = c.benchmark_group("hamiltonian_build");
    let limits = ResourceLimits::default();
    let instance = InstanceGenerator::default().spin_glass(8, 3).unwrap();
    let cache = DriverCache::new();

    group.bench_function("uncached", |b| {
        b.iter(|| AnnealingHamiltonian::new(black_box(&instance), &limits).unwrap());
    });
    group.bench_function("cached", |b| {
        b.iter(|| AnnealingHamiltonian::with_cache(black_box(&instance), &limits, &cache).unwrap());
    });

    group.finish();
}

/// Dense vs Lanczos at the same size
fn bench_spectrum(c: &mut Criterion) {
    let mut group = c.benchmark_group("spectrum");
    group.sample_size(20);

    for n in [6usize, 8, 10] {
        let instance = InstanceGenerator::default().spin_glass(n, 5).unwrap();
        let h = AnnealingHamiltonian::new(&instance, &ResourceLimits::default()).unwrap();

        for strategy in [SpectrumStrategy::DenseExact, SpectrumStrategy::SparseIterative] {
            let solver = SpectrumSolver::default().with_selector(move |_| strategy);
            group.bench_with_input(
                BenchmarkId::new(strategy.to_string(), n),
                &h,
                |b, h| {
                    b.iter(|| solver.get_spectrum(h, black_box(0.5), 2).unwrap());
                },
            );
        }
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_operator_build,
    bench_driver_cache,
    bench_spectrum
);
criterion_main!(benches);
