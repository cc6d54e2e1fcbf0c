//! Tracing setup shared by tests and embedders.
//!
//! The pool itself only emits events (slow-acquire warnings and the like); it
//! never dictates how they are collected. Embedding applications normally
//! install their own subscriber, in which case [`init_tracing`] is a no-op.

use tracing_subscriber::EnvFilter;

/// Install a default `RUST_LOG`-filtered fmt subscriber unless one is already
/// set. Safe to call from every test; repeat calls are no-ops.
pub fn init_tracing() {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}
