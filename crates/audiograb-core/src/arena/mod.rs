//! Temporary artifact lifecycle.
//!
//! A [`TempArena`] is the process-wide directory that extraction output is
//! written into. Each request obtains a [`TempArtifact`] from it: a guard
//! that owns one uniquely named file and deletes it when released. Turning
//! the guard into an [`ArtifactStream`] hands ownership to the response body,
//! so the file is removed once the body finishes or is dropped.

mod artifact_id;
mod artifact_stream;
mod temp_arena;
mod temp_artifact;

pub use artifact_id::ArtifactId;
pub use artifact_stream::ArtifactStream;
pub use temp_arena::TempArena;
pub use temp_artifact::TempArtifact;

/// File name prefix shared by every artifact in the arena.
pub const ARTIFACT_PREFIX: &str = "audio_";

/// File extension of finished artifacts.
pub const ARTIFACT_EXTENSION: &str = "mp3";
