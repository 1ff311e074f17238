//! # Block Pool Benchmark
//!
//! ARCHITECT'S REQUIREMENTS:
//! - O(1) allocate and free, flat across pool occupancy
//! - Steady-state churn touches no system allocator
//!
//! Run with: `cargo bench --package karst_pool`

// Benchmarks don't need docs and may have intentionally unused code
#![allow(missing_docs)]
#![allow(dead_code)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use karst_pool::{BlockPool, HeaderKind, PoolConfig};

/// Entity-sized blocks: a transform plus a velocity.
const OBJECT_SIZE: usize = 64;

/// Blocks per page for the churn benchmarks.
const OBJECTS_PER_PAGE: usize = 1024;

fn release_config() -> PoolConfig {
    PoolConfig {
        objects_per_page: OBJECTS_PER_PAGE,
        ..PoolConfig::default()
    }
}

fn debug_config() -> PoolConfig {
    PoolConfig {
        objects_per_page: OBJECTS_PER_PAGE,
        header: HeaderKind::Basic,
        pad_bytes: 2,
        debug_on: true,
        ..PoolConfig::default()
    }
}

/// THE CRITICAL BENCHMARK: steady-state allocate/free pair.
fn bench_churn_pair(c: &mut Criterion) {
    let mut pool = BlockPool::new(OBJECT_SIZE, release_config()).unwrap();

    c.bench_function("CRITICAL_allocate_free_pair", |b| {
        b.iter(|| {
            let block = pool.allocate().unwrap();
            pool.free(black_box(block)).unwrap();
        });
    });
}

/// Same pair with full debug instrumentation: patterns, guards, headers.
fn bench_churn_pair_debug(c: &mut Criterion) {
    let mut pool = BlockPool::new(OBJECT_SIZE, debug_config()).unwrap();

    c.bench_function("allocate_free_pair_debug", |b| {
        b.iter(|| {
            let block = pool.allocate().unwrap();
            pool.free(black_box(block)).unwrap();
        });
    });
}

/// Fill-and-drain across growing pool sizes.
fn bench_fill_drain(c: &mut Criterion) {
    let mut group = c.benchmark_group("fill_drain");

    for count in [1_000, 10_000, 100_000] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let mut pool = BlockPool::new(OBJECT_SIZE, release_config()).unwrap();
            let mut live = Vec::with_capacity(count);
            b.iter(|| {
                for _ in 0..count {
                    live.push(pool.allocate().unwrap());
                }
                for block in live.drain(..) {
                    pool.free(block).unwrap();
                }
                pool.stats().deallocations
            });
        });
    }

    group.finish();
}

/// Page churn: drain every page, reclaim, regrow.
fn bench_page_reclaim(c: &mut Criterion) {
    c.bench_function("page_reclaim_regrow", |b| {
        let mut pool = BlockPool::new(OBJECT_SIZE, release_config()).unwrap();
        let mut live = Vec::new();
        b.iter(|| {
            for _ in 0..4 * OBJECTS_PER_PAGE {
                live.push(pool.allocate().unwrap());
            }
            for block in live.drain(..) {
                pool.free(block).unwrap();
            }
            black_box(pool.free_empty_pages())
        });
    });
}

/// Baseline: the same churn against the system allocator fallback.
fn bench_fallback_baseline(c: &mut Criterion) {
    let config = PoolConfig {
        system_fallback: true,
        ..PoolConfig::default()
    };
    let mut pool = BlockPool::new(OBJECT_SIZE, config).unwrap();

    c.bench_function("allocate_free_pair_fallback", |b| {
        b.iter(|| {
            let block = pool.allocate().unwrap();
            pool.free(black_box(block)).unwrap();
        });
    });
}

criterion_group!(
    benches,
    bench_churn_pair,
    bench_churn_pair_debug,
    bench_fill_drain,
    bench_page_reclaim,
    bench_fallback_baseline
);
criterion_main!(benches);
