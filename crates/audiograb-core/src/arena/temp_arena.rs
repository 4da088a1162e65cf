//! Shared temporary directory handing out unique artifact names.

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::fs;

use super::{ARTIFACT_PREFIX, ArtifactId, TempArtifact};
use crate::{Error, Result, TRACING_TARGET_ARENA};

/// Upper bound on fresh identifiers tried before allocation gives up.
const MAX_ALLOCATION_ATTEMPTS: usize = 8;

/// Process-wide directory holding in-flight extraction artifacts.
///
/// Cloning is cheap and every clone shares the same directory and the same
/// set of live names. Requests never lock the directory itself; the only
/// shared state is the live-name set, touched in short synchronous sections.
#[derive(Debug, Clone)]
pub struct TempArena {
    inner: Arc<ArenaInner>,
}

#[derive(Debug)]
pub(crate) struct ArenaInner {
    dir: PathBuf,
    live: Mutex<HashSet<ArtifactId>>,
}

impl TempArena {
    /// Opens the arena rooted at `dir`, creating the directory if needed.
    ///
    /// The stored path is absolute so artifact paths handed to the
    /// extraction tool do not depend on its working directory.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        create_dir(&dir).await?;

        let dir = fs::canonicalize(&dir).await.map_err(|e| {
            Error::file_system()
                .with_message(format!("cannot resolve temporary directory {}", dir.display()))
                .with_source(e)
        })?;

        tracing::debug!(
            target: TRACING_TARGET_ARENA,
            dir = %dir.display(),
            "Temporary arena opened"
        );

        Ok(Self {
            inner: Arc::new(ArenaInner {
                dir,
                live: Mutex::new(HashSet::new()),
            }),
        })
    }

    /// Returns the arena directory.
    pub fn dir(&self) -> &Path {
        &self.inner.dir
    }

    /// Returns the number of artifacts currently held by guards.
    pub fn live_count(&self) -> usize {
        self.inner.live_set().len()
    }

    /// Reserves a unique artifact path.
    ///
    /// The directory is re-created if it disappeared since the arena was
    /// opened. A name that is still held by a live guard, or that already
    /// exists on disk, is never handed out twice.
    pub async fn allocate(&self) -> Result<TempArtifact> {
        create_dir(&self.inner.dir).await?;

        for _ in 0..MAX_ALLOCATION_ATTEMPTS {
            let id = ArtifactId::new();
            let path = self.inner.dir.join(id.file_name());

            if fs::try_exists(&path).await.unwrap_or(true) || !self.inner.reserve(id) {
                tracing::warn!(
                    target: TRACING_TARGET_ARENA,
                    artifact_id = %id,
                    "Artifact name already in use, retrying"
                );
                continue;
            }

            tracing::debug!(
                target: TRACING_TARGET_ARENA,
                artifact_id = %id,
                path = %path.display(),
                "Artifact allocated"
            );

            return Ok(TempArtifact::new(self.inner.clone(), id, path));
        }

        Err(Error::file_system().with_message("could not reserve a unique artifact name"))
    }

    /// Removes artifact files left behind by an earlier process.
    ///
    /// Only files named `audio_*` are considered, and names belonging to a
    /// live guard are kept. Returns the number of files removed.
    pub async fn purge_stale(&self) -> Result<usize> {
        let mut entries = fs::read_dir(&self.inner.dir).await?;
        let mut removed = 0;

        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };

            if !name.starts_with(ARTIFACT_PREFIX) || !entry.file_type().await?.is_file() {
                continue;
            }

            if let Some(id) = ArtifactId::from_file_name(name)
                && self.inner.is_live(&id)
            {
                continue;
            }

            match fs::remove_file(entry.path()).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(
                        target: TRACING_TARGET_ARENA,
                        path = %entry.path().display(),
                        error = %e,
                        "Failed to remove stale artifact"
                    );
                }
            }
        }

        if removed > 0 {
            tracing::info!(
                target: TRACING_TARGET_ARENA,
                dir = %self.inner.dir.display(),
                removed,
                "Removed stale artifacts"
            );
        }

        Ok(removed)
    }
}

impl ArenaInner {
    fn live_set(&self) -> std::sync::MutexGuard<'_, HashSet<ArtifactId>> {
        self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn reserve(&self, id: ArtifactId) -> bool {
        self.live_set().insert(id)
    }

    fn is_live(&self, id: &ArtifactId) -> bool {
        self.live_set().contains(id)
    }

    /// Returns the arena directory.
    pub(crate) fn dir(&self) -> &Path {
        &self.dir
    }

    /// Drops `id` from the live set.
    pub(crate) fn forget(&self, id: &ArtifactId) {
        self.live_set().remove(id);
    }
}

async fn create_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).await.map_err(|e| {
        Error::file_system()
            .with_message(format!("cannot create temporary directory {}", dir.display()))
            .with_source(e)
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[tokio::test]
    async fn open_creates_missing_directory() -> Result<()> {
        let root = tempfile::tempdir()?;
        let dir = root.path().join("nested").join("arena");

        let arena = TempArena::open(&dir).await?;
        assert!(arena.dir().is_dir());
        assert!(arena.dir().is_absolute());

        // Opening again over an existing directory is fine.
        TempArena::open(&dir).await?;
        Ok(())
    }

    #[tokio::test]
    async fn allocations_never_share_a_path() -> Result<()> {
        let root = tempfile::tempdir()?;
        let arena = TempArena::open(root.path()).await?;

        let mut artifacts = Vec::new();
        for _ in 0..256 {
            artifacts.push(arena.allocate().await?);
        }

        let paths: HashSet<_> = artifacts.iter().map(|a| a.path().to_path_buf()).collect();
        assert_eq!(paths.len(), artifacts.len());
        assert_eq!(arena.live_count(), artifacts.len());

        for artifact in &artifacts {
            assert_eq!(artifact.path().parent(), Some(arena.dir()));
            assert!(!artifact.path().exists());
        }

        drop(artifacts);
        assert_eq!(arena.live_count(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_allocations_are_distinct() -> Result<()> {
        let root = tempfile::tempdir()?;
        let arena = TempArena::open(root.path()).await?;

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let arena = arena.clone();
                tokio::spawn(async move { arena.allocate().await })
            })
            .collect();

        let mut artifacts = Vec::new();
        for handle in handles {
            artifacts.push(handle.await.expect("task panicked")?);
        }

        let ids: HashSet<_> = artifacts.iter().map(|a| a.id()).collect();
        assert_eq!(ids.len(), 32);
        Ok(())
    }

    #[tokio::test]
    async fn allocate_recreates_deleted_directory() -> Result<()> {
        let root = tempfile::tempdir()?;
        let dir = root.path().join("arena");
        let arena = TempArena::open(&dir).await?;

        std::fs::remove_dir(&dir)?;
        let artifact = arena.allocate().await?;
        assert!(artifact.path().parent().is_some_and(Path::is_dir));
        Ok(())
    }

    #[tokio::test]
    async fn purge_removes_leftovers_but_keeps_live_and_foreign_files() -> Result<()> {
        let root = tempfile::tempdir()?;
        let arena = TempArena::open(root.path()).await?;

        let live = arena.allocate().await?;
        std::fs::write(live.path(), b"live")?;

        let stale = arena.dir().join(ArtifactId::new().file_name());
        std::fs::write(&stale, b"stale")?;
        let legacy = arena.dir().join("audio_1700000000000.mp3");
        std::fs::write(&legacy, b"legacy")?;
        let foreign = arena.dir().join("keep.txt");
        std::fs::write(&foreign, b"keep")?;

        let removed = arena.purge_stale().await?;
        assert_eq!(removed, 2);
        assert!(live.path().exists());
        assert!(!stale.exists());
        assert!(!legacy.exists());
        assert!(foreign.exists());
        Ok(())
    }
}
