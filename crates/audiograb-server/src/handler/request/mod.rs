//! Request types for HTTP handlers.

mod download;

pub use download::*;
