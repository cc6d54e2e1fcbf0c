//! # quotapool
//!
//! FIFO quota pools for admission control and backpressure.
//!
//! A quota pool lets many concurrent callers contend for a shared, depletable
//! resource — work units, memory budget, in-flight request slots — with
//! blocking acquisition, dynamic (callback-sized) acquisition amounts, strict
//! FIFO fairness, and cancellation. Pools of this kind are the backbone of
//! admission control throughout storage and query engines: bounding
//! outstanding replication traffic, limiting memory used by concurrent
//! operations, throttling background work.
//!
//! ## Core behavior
//!
//! - **Blocking acquisition**: a request that cannot be satisfied immediately
//!   parks its task until the pool wakes it; no busy-polling.
//! - **Strict FIFO with head-of-line blocking**: requests are granted in
//!   arrival order. A request that cannot yet proceed is never skipped in
//!   favor of a smaller one behind it, so long-waiting large requests cannot
//!   starve.
//! - **Dynamic acquisition**: [`core::QuotaPool::acquire_func`] sizes the
//!   grant against the live available quota at the request's turn, atomically
//!   under the pool's lock.
//! - **Cancellation**: dropping an acquire future (or using the `*_timeout`
//!   variants) removes the request from the queue promptly; a canceled
//!   request never holds quota.
//! - **Conservation**: capacity always equals available quota plus all
//!   outstanding allocations; unreleased allocations return their quota on
//!   drop.
//!
//! ## Example
//!
//! ```
//! use quotapool::core::{Decision, IntPool};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let pool = IntPool::new("work units", 7);
//!
//! // Fixed acquisition.
//! let mut alloc = pool.acquire(3).await.unwrap();
//! assert_eq!(pool.approximate_quota(), 4);
//! alloc.release().unwrap();
//!
//! // Dynamic acquisition: take everything currently available.
//! let alloc = pool
//!     .acquire_func(|available| {
//!         if available > 0 {
//!             Decision::Take(available)
//!         } else {
//!             Decision::Wait
//!         }
//!     })
//!     .await
//!     .unwrap()
//!     .unwrap();
//! assert_eq!(alloc.amount(), 7);
//! # }
//! ```
//!
//! The pool is an in-process primitive: no persisted state, no wire protocol.
//! Pool names exist purely for logging and diagnostics by the embedding
//! system.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// The quota pool engine: generic pool, integer specialization, errors.
pub mod core;
/// Configuration models for named pools.
pub mod config;
/// Builders to construct pools from configuration.
pub mod builders;
/// Shared utilities.
pub mod util;
