//! Request extractors with structured rejections and validation.
//!
//! Drop-in replacements for their axum counterparts that reject with the
//! server's JSON [`Error`] instead of plain-text bodies.
//!
//! [`Error`]: crate::handler::Error

pub mod enhanced_json;
pub mod validated_json;

pub use self::enhanced_json::Json;
pub use self::validated_json::ValidateJson;
