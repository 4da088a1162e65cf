//! Enhanced HTTP request extractors.
//!
//! - [`Json`] - JSON deserialization with structured rejections
//! - [`ValidateJson`] - JSON extraction followed by `validator` checks

pub mod reject;

pub use crate::extract::reject::{Json, ValidateJson};
