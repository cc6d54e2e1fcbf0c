//! Builders to construct quota pools from configuration.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use crate::config::AdmissionConfig;
use crate::core::{AppResult, IntPool, PoolOptions, SlowAcquireHook};

/// Build one [`IntPool`] per entry in the admission configuration.
///
/// # Errors
///
/// Fails when the configuration does not validate.
pub fn build_pools(cfg: &AdmissionConfig) -> AppResult<HashMap<String, IntPool>> {
    cfg.validate()
        .map_err(anyhow::Error::msg)
        .context("admission config invalid")?;

    let mut pools = HashMap::new();
    for (name, pool_cfg) in &cfg.pools {
        let mut opts = PoolOptions::new();
        if let Some(max) = pool_cfg.max_capacity {
            opts = opts.with_max_capacity(max);
        }
        if let Some(threshold_ms) = pool_cfg.slow_acquire_threshold_ms {
            let threshold = Duration::from_millis(threshold_ms);
            let hook: SlowAcquireHook = Arc::new(|pool: &str, waited: Duration| {
                tracing::warn!(pool, waited = ?waited, "configured slow-acquire threshold exceeded");
            });
            opts = opts.with_slow_acquire(threshold, hook);
        }
        pools.insert(
            name.clone(),
            IntPool::with_options(name.clone(), pool_cfg.capacity, opts),
        );
    }

    Ok(pools)
}
