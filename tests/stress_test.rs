//! Randomized concurrency tests for the conservation invariant.
//!
//! With a bounded pool of capacity C, at every point the quota held by live
//! allocations plus the pool's available quota must equal C, and `available`
//! must never be observed negative. The tests drive many tasks through
//! random acquire/release interleavings and assert the bound after every
//! grant.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use quotapool::core::{Decision, IntPool};
use quotapool::util::init_tracing;
use rand::Rng;

// Deliberately smaller than the tasks' peak demand so requests queue.
const CAPACITY: i64 = 30;
const TASKS: usize = 8;
const ITERATIONS: usize = 200;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_conservation_under_random_fixed_acquires() {
    init_tracing();
    let pool = IntPool::new("stress-fixed", CAPACITY);
    let outstanding = Arc::new(AtomicI64::new(0));

    let mut tasks = Vec::new();
    for _ in 0..TASKS {
        let pool = pool.clone();
        let outstanding = Arc::clone(&outstanding);
        tasks.push(tokio::spawn(async move {
            for _ in 0..ITERATIONS {
                let amount = rand::rng().random_range(1..=10i64);
                let alloc = pool.acquire(amount).await.unwrap();
                let held = outstanding.fetch_add(amount, Ordering::SeqCst) + amount;
                assert!(held <= CAPACITY, "outstanding {held} exceeds {CAPACITY}");
                assert!(pool.approximate_quota() >= 0);
                tokio::task::yield_now().await;
                outstanding.fetch_sub(amount, Ordering::SeqCst);
                drop(alloc);
            }
        }));
    }
    futures::future::try_join_all(tasks).await.unwrap();

    assert_eq!(pool.approximate_quota(), CAPACITY);
    assert_eq!(pool.queue_len(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_acquire_func_never_double_allocates() {
    // Decision callbacks run under the pool lock, so no two of them may
    // observe the same availability snapshot: the sum of all granted takes
    // can never exceed capacity.
    init_tracing();
    let pool = IntPool::new("stress-func", CAPACITY);
    let outstanding = Arc::new(AtomicI64::new(0));

    let mut tasks = Vec::new();
    for _ in 0..TASKS {
        let pool = pool.clone();
        let outstanding = Arc::clone(&outstanding);
        tasks.push(tokio::spawn(async move {
            for _ in 0..ITERATIONS {
                let alloc = pool
                    .acquire_func(|available| {
                        if available <= 0 {
                            return Decision::Wait;
                        }
                        let want = rand::rng().random_range(1..=10i64);
                        Decision::Take(want.min(available))
                    })
                    .await
                    .unwrap()
                    .expect("decision never stops");
                let amount = alloc.amount();
                let held = outstanding.fetch_add(amount, Ordering::SeqCst) + amount;
                assert!(held <= CAPACITY, "granted {held} of {CAPACITY}");
                tokio::task::yield_now().await;
                outstanding.fetch_sub(amount, Ordering::SeqCst);
                drop(alloc);
            }
        }));
    }
    futures::future::try_join_all(tasks).await.unwrap();

    assert_eq!(pool.approximate_quota(), CAPACITY);
    assert_eq!(pool.queue_len(), 0);
}
