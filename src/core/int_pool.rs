//! Integer-quantity quota pool.
//!
//! The specialization most callers want: quota is a plain signed 64-bit
//! counter (work units, in-flight slots, budget bytes). Everything delegates
//! to the generic engine in [`crate::core::pool`], fixing the quantity type
//! to `i64`.

use std::time::Duration;

use crate::core::error::PoolError;
use crate::core::pool::{Alloc, Decision, PoolOptions, QuotaPool};

/// A quota pool counting `i64` units.
///
/// # Examples
///
/// ```
/// use quotapool::core::IntPool;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let pool = IntPool::new("work units", 10);
/// let mut alloc = pool.acquire(4).await.unwrap();
/// assert_eq!(pool.approximate_quota(), 6);
/// alloc.release().unwrap();
/// assert_eq!(pool.approximate_quota(), 10);
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct IntPool {
    inner: QuotaPool<i64>,
}

/// An allocation of `i64` units from an [`IntPool`].
#[derive(Debug)]
pub struct IntAlloc {
    inner: Alloc<i64>,
}

impl IntAlloc {
    /// The number of units held.
    pub fn amount(&self) -> i64 {
        self.inner.amount()
    }

    /// Return the held units to the pool.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::AllocReleased`] on the second and subsequent
    /// calls.
    pub fn release(&mut self) -> Result<(), PoolError> {
        self.inner.release()
    }
}

impl IntPool {
    /// Create a pool holding `capacity` units, bounded by `capacity`.
    pub fn new(name: impl Into<String>, capacity: i64) -> Self {
        Self {
            inner: QuotaPool::new(name, capacity),
        }
    }

    /// Create a pool with explicit [`PoolOptions`].
    pub fn with_options(name: impl Into<String>, capacity: i64, opts: PoolOptions<i64>) -> Self {
        Self {
            inner: QuotaPool::with_options(name, capacity, opts),
        }
    }

    /// The name this pool was constructed with.
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Acquire `amount` units, parking until they are available.
    ///
    /// # Errors
    ///
    /// See [`QuotaPool::acquire`].
    pub async fn acquire(&self, amount: i64) -> Result<IntAlloc, PoolError> {
        self.inner.acquire(amount).await.map(|inner| IntAlloc { inner })
    }

    /// Acquire `amount` units or fail with [`PoolError::Canceled`] after
    /// `timeout`.
    ///
    /// # Errors
    ///
    /// See [`QuotaPool::acquire_timeout`].
    pub async fn acquire_timeout(
        &self,
        amount: i64,
        timeout: Duration,
    ) -> Result<IntAlloc, PoolError> {
        self.inner
            .acquire_timeout(amount, timeout)
            .await
            .map(|inner| IntAlloc { inner })
    }

    /// Acquire a caller-decided number of units; see
    /// [`QuotaPool::acquire_func`] for the callback contract.
    ///
    /// # Errors
    ///
    /// See [`QuotaPool::acquire_func`].
    pub async fn acquire_func<F>(&self, decide: F) -> Result<Option<IntAlloc>, PoolError>
    where
        F: FnMut(i64) -> Decision<i64>,
    {
        self.inner
            .acquire_func(decide)
            .await
            .map(|opt| opt.map(|inner| IntAlloc { inner }))
    }

    /// Deadline-bounded variant of [`IntPool::acquire_func`].
    ///
    /// # Errors
    ///
    /// See [`QuotaPool::acquire_func_timeout`].
    pub async fn acquire_func_timeout<F>(
        &self,
        decide: F,
        timeout: Duration,
    ) -> Result<Option<IntAlloc>, PoolError>
    where
        F: FnMut(i64) -> Decision<i64>,
    {
        self.inner
            .acquire_func_timeout(decide, timeout)
            .await
            .map(|opt| opt.map(|inner| IntAlloc { inner }))
    }

    /// Administratively add `delta` units, raising both the available amount
    /// and the capacity bound.
    pub fn add_capacity(&self, delta: i64) {
        self.inner.add_capacity(delta);
    }

    /// Close the pool, failing all queued and future acquisitions.
    pub fn close(&self, reason: &str) {
        self.inner.close(reason);
    }

    /// Best-effort snapshot of the available units, for diagnostics only.
    pub fn approximate_quota(&self) -> i64 {
        self.inner.approximate_quota()
    }

    /// The pool's capacity bound, or `None` if unbounded.
    pub fn capacity(&self) -> Option<i64> {
        self.inner.capacity()
    }

    /// Number of requests currently parked in the queue.
    pub fn queue_len(&self) -> usize {
        self.inner.queue_len()
    }
}
