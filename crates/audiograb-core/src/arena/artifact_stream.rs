//! Chunked byte stream over a finished artifact.

use std::fmt;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;
use pin_project_lite::pin_project;
use tokio::fs::File;
use tokio_util::io::ReaderStream;

use super::TempArtifact;
use crate::TRACING_TARGET_ARENA;

/// Size of the chunks read from disk.
const CHUNK_SIZE: usize = 64 * 1024;

pin_project! {
    /// Streams an artifact from disk and deletes it afterwards.
    ///
    /// The artifact guard is released as soon as the underlying reader
    /// reports end of file or an I/O error. If the stream is dropped before
    /// that, for example because the client disconnected, the guard is
    /// dropped with it. Either way the file is deleted exactly once.
    pub struct ArtifactStream {
        #[pin]
        reader: ReaderStream<File>,
        len: u64,
        artifact: Option<TempArtifact>,
    }
}

impl ArtifactStream {
    pub(crate) fn new(file: File, len: u64, artifact: TempArtifact) -> Self {
        Self {
            reader: ReaderStream::with_capacity(file, CHUNK_SIZE),
            len,
            artifact: Some(artifact),
        }
    }

    /// Returns the artifact size in bytes at the time it was opened.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Returns `true` if the artifact was empty when opened.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns `true` once the underlying artifact has been deleted.
    pub fn is_released(&self) -> bool {
        self.artifact.is_none()
    }
}

impl Stream for ArtifactStream {
    type Item = io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        let poll = this.reader.poll_next(cx);

        match &poll {
            Poll::Ready(None) => {
                if let Some(mut artifact) = this.artifact.take() {
                    tracing::debug!(
                        target: TRACING_TARGET_ARENA,
                        artifact_id = %artifact.id(),
                        len = *this.len,
                        "Artifact fully streamed"
                    );
                    artifact.release();
                }
            }
            Poll::Ready(Some(Err(e))) => {
                if let Some(mut artifact) = this.artifact.take() {
                    tracing::warn!(
                        target: TRACING_TARGET_ARENA,
                        artifact_id = %artifact.id(),
                        error = %e,
                        "Artifact stream failed"
                    );
                    artifact.release();
                }
            }
            _ => {}
        }

        poll
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.reader.size_hint()
    }
}

impl fmt::Debug for ArtifactStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArtifactStream")
            .field("len", &self.len)
            .field("artifact", &self.artifact)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use crate::Result;
    use crate::arena::TempArena;

    #[tokio::test]
    async fn streams_content_then_deletes() -> Result<()> {
        let root = tempfile::tempdir()?;
        let arena = TempArena::open(root.path()).await?;

        let artifact = arena.allocate().await?;
        let path = artifact.path().to_path_buf();
        let payload: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(&path, &payload)?;

        let mut stream = artifact.into_stream().await?;
        assert_eq!(stream.len(), payload.len() as u64);

        let mut received = Vec::new();
        let mut chunks = 0;
        while let Some(chunk) = stream.next().await {
            received.extend_from_slice(&chunk?);
            chunks += 1;
        }

        assert_eq!(received, payload);
        assert!(chunks > 1);
        assert!(stream.is_released());
        assert!(!path.exists());
        assert_eq!(arena.live_count(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn dropping_mid_stream_deletes() -> Result<()> {
        let root = tempfile::tempdir()?;
        let arena = TempArena::open(root.path()).await?;

        let artifact = arena.allocate().await?;
        let path = artifact.path().to_path_buf();
        std::fs::write(&path, vec![7u8; 300_000])?;

        let mut stream = artifact.into_stream().await?;
        let first = stream.next().await.transpose()?;
        assert!(first.is_some());
        assert!(path.exists());

        drop(stream);
        assert!(!path.exists());
        assert_eq!(arena.live_count(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn empty_artifact_ends_immediately() -> Result<()> {
        let root = tempfile::tempdir()?;
        let arena = TempArena::open(root.path()).await?;

        let artifact = arena.allocate().await?;
        let path = artifact.path().to_path_buf();
        std::fs::write(&path, b"")?;

        let mut stream = artifact.into_stream().await?;
        assert!(stream.is_empty());
        assert!(stream.next().await.is_none());
        assert!(!path.exists());
        Ok(())
    }
}
