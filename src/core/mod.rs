//! The quota pool engine and its error taxonomy.

pub mod error;
pub mod int_pool;
pub mod pool;
pub mod quota;

pub use error::{AppResult, PoolError};
pub use int_pool::{IntAlloc, IntPool};
pub use pool::{
    Alloc, Decision, PoolOptions, QuotaPool, SlowAcquireHook, DEFAULT_SLOW_ACQUIRE_THRESHOLD,
};
pub use quota::Quota;
