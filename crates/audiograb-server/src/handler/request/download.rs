use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request payload for extracting audio from a video URL.
///
/// The URL is opaque to the server: no scheme or reachability checks are
/// made, the extraction tool reports unusable URLs.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Validate)]
pub struct DownloadRequest {
    /// Address of the video whose audio track is extracted.
    #[validate(length(min = 1, message = "must be a non-empty string"))]
    pub url: String,
}
