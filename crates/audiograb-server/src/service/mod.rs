//! Application state and dependency injection.

mod config;

use std::sync::Arc;

use audiograb_core::arena::TempArena;
use audiograb_core::extract::{AudioExtractor, YtDlpExtractor};

pub use crate::service::config::{ServiceConfig, ServiceConfigBuilder, ServiceConfigBuilderError};
use crate::utility::tracing_targets::TRACING_TARGET_SERVICE;
// Re-export error types from crate root for convenience
pub use crate::{Error, Result};

/// Per-response download settings.
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    attachment_name: Arc<str>,
}

impl DownloadOptions {
    /// Creates new options with the given attachment file name.
    pub fn new(attachment_name: impl Into<Arc<str>>) -> Self {
        Self {
            attachment_name: attachment_name.into(),
        }
    }

    /// Returns the file name announced in `Content-Disposition`.
    #[inline]
    pub fn attachment_name(&self) -> &str {
        &self.attachment_name
    }
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self::new(ServiceConfig::default().attachment_name)
    }
}

/// Application state.
///
/// Used for the [`State`] extraction (dependency injection).
///
/// [`State`]: axum::extract::State
#[must_use = "state does nothing unless you use it"]
#[derive(Clone)]
pub struct ServiceState {
    pub arena: TempArena,
    pub extractor: Arc<dyn AudioExtractor>,
    pub download: DownloadOptions,
}

impl ServiceState {
    /// Creates the state from already constructed parts.
    pub fn new(
        arena: TempArena,
        extractor: Arc<dyn AudioExtractor>,
        download: DownloadOptions,
    ) -> Self {
        Self {
            arena,
            extractor,
            download,
        }
    }

    /// Initializes application state from configuration.
    ///
    /// Opens the temporary arena, removes artifacts left by a previous
    /// process and prepares the yt-dlp extractor.
    pub async fn from_config(config: &ServiceConfig) -> Result<Self> {
        config.validate()?;

        let arena = TempArena::open(&config.temp_dir).await?;

        match arena.purge_stale().await {
            Ok(0) => {}
            Ok(removed) => tracing::info!(
                target: TRACING_TARGET_SERVICE,
                removed,
                dir = %arena.dir().display(),
                "Removed stale artifacts"
            ),
            Err(error) => tracing::warn!(
                target: TRACING_TARGET_SERVICE,
                error = %error,
                dir = %arena.dir().display(),
                "Failed to purge stale artifacts"
            ),
        }

        let extractor = YtDlpExtractor::new(config.extractor_config()?);

        tracing::debug!(
            target: TRACING_TARGET_SERVICE,
            dir = %arena.dir().display(),
            program = %config.extractor_program.display(),
            timeout_secs = config.extraction_timeout,
            "Service state initialized"
        );

        Ok(Self::new(
            arena,
            Arc::new(extractor),
            DownloadOptions::new(config.attachment_name.as_str()),
        ))
    }
}

macro_rules! impl_di {
    ($($f:ident: $t:ty),+) => {$(
        impl axum::extract::FromRef<ServiceState> for $t {
            fn from_ref(state: &ServiceState) -> Self {
                state.$f.clone()
            }
        }
    )+};
}

impl_di!(arena: TempArena);
impl_di!(extractor: Arc<dyn AudioExtractor>);
impl_di!(download: DownloadOptions);

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn from_config_creates_temp_dir() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let config = ServiceConfig::builder()
            .with_temp_dir(root.path().join("nested").join("audio"))
            .with_attachment_name("track.mp3")
            .build()?;

        let state = ServiceState::from_config(&config).await?;
        assert!(state.arena.dir().is_dir());
        assert_eq!(state.download.attachment_name(), "track.mp3");
        Ok(())
    }

    #[tokio::test]
    async fn from_config_purges_stale_artifacts() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let stale = root
            .path()
            .join("audio_0190a5c2-0000-7000-8000-000000000000.mp3");
        let foreign = root.path().join("keep.txt");
        tokio::fs::write(&stale, b"partial").await?;
        tokio::fs::write(&foreign, b"other").await?;

        let config = ServiceConfig::builder()
            .with_temp_dir(root.path())
            .build()?;
        let _state = ServiceState::from_config(&config).await?;

        assert!(!stale.exists());
        assert!(foreign.exists());
        Ok(())
    }

    #[tokio::test]
    async fn from_config_rejects_invalid_attachment_name() {
        let config = ServiceConfig {
            attachment_name: "bad\"name.mp3".to_owned(),
            ..ServiceConfig::default()
        };

        let error = ServiceState::from_config(&config).await.err();
        assert!(error.is_some_and(|e| e.kind() == crate::ErrorKind::Config));
    }
}
