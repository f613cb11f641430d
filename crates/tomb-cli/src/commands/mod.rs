//! CLI command implementations for Tomb.

pub mod check;
pub mod rewrite;
pub mod tables;
