//! External audio extraction.

use std::path::Path;

use async_trait::async_trait;

use crate::Result;

mod config;
mod yt_dlp;

pub use config::{ExtractorConfig, ExtractorConfigBuilder, ExtractorConfigBuilderError};
pub use yt_dlp::YtDlpExtractor;

/// Produces an audio file from a remote media URL.
///
/// Implementations write their output to `output` and return once it is
/// complete. On error the caller is responsible for reclaiming whatever was
/// written; the artifact guard handles that.
#[async_trait]
pub trait AudioExtractor: Send + Sync {
    /// Extracts the audio track of `source_url` into `output`.
    ///
    /// `source_url` is opaque: no scheme or reachability checks are made
    /// before it reaches the extraction tool.
    async fn extract(&self, source_url: &str, output: &Path) -> Result<()>;
}
