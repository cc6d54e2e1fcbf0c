//! Quota pool configuration structures.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Configuration for a single quota pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaPoolConfig {
    /// Initial quota units held by the pool.
    pub capacity: i64,
    /// Optional bound on total quota ever outstanding; defaults to
    /// `capacity` when absent.
    pub max_capacity: Option<i64>,
    /// Threshold in milliseconds after which a waiting acquisition is
    /// reported as slow. Defaults to the engine's built-in threshold.
    pub slow_acquire_threshold_ms: Option<u64>,
}

/// Root admission-control configuration: named pools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmissionConfig {
    /// Map of pool name to configuration.
    pub pools: HashMap<String, QuotaPoolConfig>,
}

impl QuotaPoolConfig {
    /// Validate pool configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.capacity < 0 {
            return Err("capacity must not be negative".into());
        }
        if let Some(max) = self.max_capacity {
            if max < self.capacity {
                return Err("max_capacity must be at least capacity".into());
            }
        }
        if self.slow_acquire_threshold_ms == Some(0) {
            return Err("slow_acquire_threshold_ms must be greater than 0".into());
        }
        Ok(())
    }
}

impl AdmissionConfig {
    /// Validate all pools and ensure at least one pool exists.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid pool.
    pub fn validate(&self) -> Result<(), String> {
        if self.pools.is_empty() {
            return Err("at least one pool must be defined".into());
        }
        for (name, pool) in &self.pools {
            pool.validate()
                .map_err(|e| format!("pool `{name}` invalid: {e}"))?;
        }
        Ok(())
    }

    /// Parse admission configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns a description of the parse or validation failure.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: AdmissionConfig =
            serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }
}
