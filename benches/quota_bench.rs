//! Benchmarks for quota pool acquisition.
//!
//! Covers:
//! - Uncontended fixed and decision-based acquisition
//! - Contended acquisition with many tasks over a small pool

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tokio::runtime::Runtime;

use quotapool::core::{Decision, IntPool};

fn bench_uncontended(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("uncontended");
    group.throughput(Throughput::Elements(1));

    group.bench_function("acquire_release", |b| {
        let pool = IntPool::new("bench", 1 << 20);
        b.to_async(&rt).iter(|| {
            let pool = pool.clone();
            async move {
                let alloc = pool.acquire(black_box(1)).await.unwrap();
                drop(alloc);
            }
        });
    });

    group.bench_function("acquire_func_release", |b| {
        let pool = IntPool::new("bench", 1 << 20);
        b.to_async(&rt).iter(|| {
            let pool = pool.clone();
            async move {
                let alloc = pool
                    .acquire_func(|available| Decision::Take(black_box(available.min(1))))
                    .await
                    .unwrap()
                    .unwrap();
                drop(alloc);
            }
        });
    });

    group.finish();
}

fn bench_contended(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("contended");

    for workers in [2_usize, 8] {
        const OPS_PER_WORKER: usize = 100;
        group.throughput(Throughput::Elements((workers * OPS_PER_WORKER) as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(workers),
            &workers,
            |b, &workers| {
                // Pool deliberately smaller than total demand so tasks queue.
                let pool = IntPool::new("bench", 4);
                b.to_async(&rt).iter(|| {
                    let pool = pool.clone();
                    async move {
                        let mut tasks = Vec::with_capacity(workers);
                        for _ in 0..workers {
                            let pool = pool.clone();
                            tasks.push(tokio::spawn(async move {
                                for _ in 0..OPS_PER_WORKER {
                                    let alloc = pool.acquire(black_box(2)).await.unwrap();
                                    drop(alloc);
                                }
                            }));
                        }
                        for t in tasks {
                            t.await.unwrap();
                        }
                    }
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_uncontended, bench_contended);
criterion_main!(benches);
