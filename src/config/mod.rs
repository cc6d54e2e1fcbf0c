//! Configuration models for quota pools.

pub mod pool;

pub use pool::{AdmissionConfig, QuotaPoolConfig};
