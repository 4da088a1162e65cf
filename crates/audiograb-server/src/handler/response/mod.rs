//! Response types for HTTP handlers.

mod audio;
mod errors;

pub use audio::*;
pub use errors::*;
