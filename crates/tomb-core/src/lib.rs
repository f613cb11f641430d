//! # tomb-core
//!
//! Configuration types shared across all Tomb crates.
//!
//! The rewriting engine itself lives in `tomb-rewrite`; this crate only knows
//! how to describe and load the set of soft-delete tables and the limits the
//! engine runs under.

// Configuration types shared across all Tomb crates
pub mod config;

// Re-export commonly used config types for convenience
pub use config::{ConfigError, LoggingConfig, RewriteLimits, SoftDeleteConfig, TombConfig};
