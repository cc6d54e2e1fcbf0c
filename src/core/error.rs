//! Error types for quota pool operations.

use thiserror::Error;

/// Errors produced by quota pool operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    /// The requested amount can never be satisfied by this pool.
    #[error("invalid quota request: {0}")]
    InvalidRequest(String),
    /// The caller's deadline expired before the request could be granted.
    #[error("quota acquisition canceled: {0}")]
    Canceled(String),
    /// The pool was closed before or while the request was queued.
    #[error("pool closed: {0}")]
    Closed(String),
    /// A decision callback took more quota than was available.
    ///
    /// This signals a caller bug, not a recoverable runtime condition; the
    /// over-take is refused before any state change so the conservation
    /// invariant is preserved.
    #[error("internal invariant violation: {0}")]
    InternalInvariantViolation(String),
    /// An allocation was released more than once.
    #[error("allocation already released")]
    AllocReleased,
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
