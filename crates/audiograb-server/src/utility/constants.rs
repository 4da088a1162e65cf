//! Shared constants used across the server crate.

/// Default maximum request body size: 64KB.
///
/// Download requests only carry a URL, so anything larger is rejected
/// before it is buffered.
pub const DEFAULT_MAX_BODY_SIZE: usize = 64 * 1024;

/// Media type of extracted audio.
pub const AUDIO_MPEG: &str = "audio/mpeg";

/// Name of the request ID header set and propagated by the observability layer.
pub const REQUEST_ID_HEADER: &str = "x-request-id";
