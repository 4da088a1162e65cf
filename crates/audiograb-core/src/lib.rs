#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for temporary arena and artifact lifecycle.
pub const TRACING_TARGET_ARENA: &str = "audiograb_core::arena";

/// Tracing target for external extraction processes.
pub const TRACING_TARGET_EXTRACT: &str = "audiograb_core::extract";

mod error;

pub mod arena;
pub mod extract;

pub use error::{BoxedError, Error, ErrorKind, Result};
