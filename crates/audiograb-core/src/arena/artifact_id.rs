//! Time-ordered artifact identifiers.

use derive_more::{Display, From};
use uuid::Uuid;

use super::{ARTIFACT_EXTENSION, ARTIFACT_PREFIX};

/// Unique identifier of a temporary artifact.
///
/// Backed by a `UUIDv7`: the leading 48 bits carry the creation time in
/// milliseconds and the remaining 74 bits are random, so two artifacts
/// allocated within the same millisecond still get distinct names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(Display, From)]
#[display("{_0}")]
pub struct ArtifactId(Uuid);

impl ArtifactId {
    /// Creates a fresh identifier stamped with the current time.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Parses an identifier out of an artifact file name such as
    /// `audio_<uuid>.mp3` or `audio_<uuid>.webm.part`.
    ///
    /// Returns `None` for names that do not follow the artifact layout.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let rest = name.strip_prefix(ARTIFACT_PREFIX)?;
        let stem = rest.split('.').next()?;
        Uuid::parse_str(stem).ok().map(Self)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }

    /// Returns the file stem, `audio_<uuid>`, shared by the artifact and any
    /// intermediate files the extraction tool writes next to it.
    #[must_use]
    pub fn file_stem(&self) -> String {
        format!("{ARTIFACT_PREFIX}{}", self.0)
    }

    /// Returns the final artifact file name, `audio_<uuid>.mp3`.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{}.{ARTIFACT_EXTENSION}", self.file_stem())
    }
}

impl Default for ArtifactId {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn is_version_seven() {
        let id = ArtifactId::new();
        assert_eq!(id.as_uuid().get_version_num(), 7);
    }

    #[test]
    fn same_millisecond_ids_are_distinct() {
        let ids: HashSet<_> = (0..10_000).map(|_| ArtifactId::new()).collect();
        assert_eq!(ids.len(), 10_000);
    }

    #[test]
    fn file_name_layout() {
        let id = ArtifactId::new();
        let name = id.file_name();
        assert!(name.starts_with("audio_"));
        assert!(name.ends_with(".mp3"));
        assert_eq!(ArtifactId::from_file_name(&name), Some(id));
    }

    #[test]
    fn parses_intermediate_file_names() {
        let id = ArtifactId::new();
        let name = format!("{}.webm.part", id.file_stem());
        assert_eq!(ArtifactId::from_file_name(&name), Some(id));
    }

    #[test]
    fn rejects_foreign_names() {
        assert_eq!(ArtifactId::from_file_name("notes.txt"), None);
        assert_eq!(ArtifactId::from_file_name("audio_1700000000000.mp3"), None);
    }
}
