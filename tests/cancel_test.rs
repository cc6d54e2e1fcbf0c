//! Cancellation and timeout behavior.
//!
//! A parked request must unblock promptly when its deadline expires or its
//! future is dropped, leave no trace in the queue, and never hold quota.

use std::time::Duration;

use quotapool::core::{IntPool, PoolError};
use quotapool::util::init_tracing;
use tokio::time::Instant;

#[tokio::test]
async fn test_timeout_returns_canceled_promptly() {
    init_tracing();
    let pool = IntPool::new("cancel", 1);
    let _held = pool.acquire(1).await.unwrap();

    let start = Instant::now();
    let err = pool
        .acquire_timeout(1, Duration::from_millis(100))
        .await
        .unwrap_err();
    let elapsed = start.elapsed();

    assert!(matches!(err, PoolError::Canceled(_)));
    assert!(elapsed >= Duration::from_millis(100));
    assert!(
        elapsed < Duration::from_millis(1000),
        "took {elapsed:?} to observe the deadline"
    );
    // The canceled request left the queue.
    assert_eq!(pool.queue_len(), 0);
    assert_eq!(pool.approximate_quota(), 0);
}

#[tokio::test]
async fn test_zero_timeout_fails_before_synchronous_check() {
    let pool = IntPool::new("cancel", 5);
    // Quota is available, but an already-expired deadline wins.
    let err = pool.acquire_timeout(1, Duration::ZERO).await.unwrap_err();
    assert!(matches!(err, PoolError::Canceled(_)));
    assert_eq!(pool.approximate_quota(), 5);
}

#[tokio::test]
async fn test_dropped_future_leaves_queue() {
    init_tracing();
    let pool = IntPool::new("cancel", 1);
    let held = pool.acquire(1).await.unwrap();

    tokio::select! {
        res = pool.acquire(1) => {
            panic!("should not have been granted: {:?}", res.map(|a| a.amount()));
        }
        () = tokio::time::sleep(Duration::from_millis(50)) => {}
    }

    // Dropping the acquire future removed its queue entry.
    assert_eq!(pool.queue_len(), 0);

    drop(held);
    let alloc = pool.acquire(1).await.unwrap();
    assert_eq!(alloc.amount(), 1);
}

#[tokio::test]
async fn test_canceled_head_promotes_next_waiter() {
    init_tracing();
    let pool = IntPool::new("cancel", 4);
    let held = pool.acquire(3).await.unwrap();
    assert_eq!(pool.approximate_quota(), 1);

    // Head wants more than is free and will expire; the request behind it
    // could be satisfied right now but must wait its turn.
    let head = {
        let pool = pool.clone();
        tokio::spawn(async move { pool.acquire_timeout(4, Duration::from_millis(100)).await })
    };
    while pool.queue_len() != 1 {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    let behind = {
        let pool = pool.clone();
        tokio::spawn(async move { pool.acquire(1).await })
    };
    while pool.queue_len() != 2 {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    let err = head.await.unwrap().unwrap_err();
    assert!(matches!(err, PoolError::Canceled(_)));

    // Cancellation of the head re-evaluated the promoted request at once.
    let alloc = behind.await.unwrap().unwrap();
    assert_eq!(alloc.amount(), 1);
    assert_eq!(pool.approximate_quota(), 0);
    drop(held);
}

#[tokio::test]
async fn test_acquire_func_timeout() {
    let pool = IntPool::new("cancel", 2);
    let _held = pool.acquire(2).await.unwrap();

    let err = pool
        .acquire_func_timeout(
            |available| {
                if available >= 1 {
                    quotapool::core::Decision::Take(1)
                } else {
                    quotapool::core::Decision::Wait
                }
            },
            Duration::from_millis(50),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, PoolError::Canceled(_)));
    assert_eq!(pool.queue_len(), 0);
}
