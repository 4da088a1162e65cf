//! Guard owning a single temporary artifact.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs::File;
use tokio::runtime::Handle;

use super::ArtifactId;
use super::artifact_stream::ArtifactStream;
use super::temp_arena::ArenaInner;
use crate::{Result, TRACING_TARGET_ARENA};

/// One request's extraction output, deleted when released.
///
/// The guard starts out owning a reserved but not yet written path. Whatever
/// ends up on disk under that name, including intermediate files the
/// extraction tool writes next to it (`audio_<id>.webm`, `audio_<id>.mp3.part`),
/// is removed exactly once: by an explicit [`release`], or by `Drop` on every
/// other exit path such as an early return, a panic, a timeout or a dropped
/// request future.
///
/// Removal failures are logged and never surfaced.
///
/// [`release`]: TempArtifact::release
#[derive(Debug)]
#[must_use = "the artifact is deleted as soon as the guard is dropped"]
pub struct TempArtifact {
    arena: Arc<ArenaInner>,
    id: ArtifactId,
    path: PathBuf,
    released: bool,
}

impl TempArtifact {
    pub(crate) fn new(arena: Arc<ArenaInner>, id: ArtifactId, path: PathBuf) -> Self {
        Self {
            arena,
            id,
            path,
            released: false,
        }
    }

    /// Returns the artifact identifier.
    pub fn id(&self) -> ArtifactId {
        self.id
    }

    /// Returns the absolute path the artifact is written to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `true` once the artifact has been deleted.
    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Opens the finished artifact as a chunked byte stream.
    ///
    /// The stream takes over the guard, so the file is deleted when the
    /// stream reaches its end, fails, or is dropped.
    pub async fn into_stream(self) -> Result<ArtifactStream> {
        let file = File::open(&self.path).await?;
        let len = file.metadata().await?.len();

        tracing::debug!(
            target: TRACING_TARGET_ARENA,
            artifact_id = %self.id,
            len,
            "Artifact opened for streaming"
        );

        Ok(ArtifactStream::new(file, len, self))
    }

    /// Deletes the artifact and any sibling files sharing its stem.
    ///
    /// The artifact itself is unlinked immediately. The arena scan for
    /// intermediate files runs on the blocking pool when a runtime is
    /// available, inline otherwise. Calling this more than once is a no-op.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        remove_quietly(&self.id, &self.path);

        let id = self.id;
        let dir = self.arena.dir().to_path_buf();
        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(move || remove_siblings(&id, &dir));
            }
            Err(_) => remove_siblings(&id, &dir),
        }

        self.arena.forget(&self.id);

        tracing::debug!(
            target: TRACING_TARGET_ARENA,
            artifact_id = %self.id,
            "Artifact released"
        );
    }
}

impl Drop for TempArtifact {
    fn drop(&mut self) {
        self.release();
    }
}

/// Removes intermediate files such as `audio_<id>.webm` or `audio_<id>.mp3.part`.
fn remove_siblings(id: &ArtifactId, dir: &Path) {
    let prefix = format!("{}.", id.file_stem());
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return,
        Err(e) => {
            tracing::warn!(
                target: TRACING_TARGET_ARENA,
                artifact_id = %id,
                error = %e,
                "Failed to scan arena for intermediate files"
            );
            return;
        }
    };

    for entry in entries.flatten() {
        let is_sibling = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with(&prefix));
        if is_sibling {
            remove_quietly(id, &entry.path());
        }
    }
}

fn remove_quietly(id: &ArtifactId, path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(
                target: TRACING_TARGET_ARENA,
                artifact_id = %id,
                path = %path.display(),
                error = %e,
                "Failed to delete artifact"
            );
        }
    }
}
