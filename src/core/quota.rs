//! The resource quantity abstraction the pool engine operates on.

use std::fmt;

/// A depletable resource quantity.
///
/// The pool engine only needs to add quota back on release, subtract it on
/// grant, and decide whether a requested amount fits into what is currently
/// available. Anything with those three operations can be pooled; the common
/// case is a plain counter (see [`crate::core::IntPool`]).
///
/// Implementations are plain values: `Copy`, cheap to move, and compared only
/// through the methods below.
pub trait Quota: Copy + Send + Sync + PartialEq + fmt::Debug + 'static {
    /// The empty quantity.
    fn zero() -> Self;

    /// Combine two quantities.
    fn add(self, other: Self) -> Self;

    /// Remove `other` from `self`. Only called when `other.fits_in(self)`.
    fn sub(self, other: Self) -> Self;

    /// Whether a request for `self` can be satisfied out of `available`.
    fn fits_in(self, available: Self) -> bool;

    /// Whether this is the empty quantity.
    fn is_zero(self) -> bool;

    /// Whether this is a sensible amount to request at all.
    ///
    /// For counters this rejects negative amounts. An invalid amount fails
    /// acquisition immediately instead of being enqueued.
    fn is_valid(self) -> bool;
}

impl Quota for i64 {
    fn zero() -> Self {
        0
    }

    fn add(self, other: Self) -> Self {
        self.saturating_add(other)
    }

    fn sub(self, other: Self) -> Self {
        self - other
    }

    fn fits_in(self, available: Self) -> bool {
        self <= available
    }

    fn is_zero(self) -> bool {
        self == 0
    }

    fn is_valid(self) -> bool {
        self >= 0
    }
}
