//! Utility modules for common functionality across the crate.

pub mod constants;
pub mod tracing_targets;

pub use constants::*;
