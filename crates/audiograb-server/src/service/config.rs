use std::path::PathBuf;
use std::time::Duration;

use audiograb_core::extract::ExtractorConfig;
#[cfg(feature = "config")]
use clap::Args;
use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Default values for configuration options.
mod defaults {
    use std::path::PathBuf;

    /// Default extraction program, resolved through `PATH`.
    pub const EXTRACTOR_PROGRAM: &str = "yt-dlp";

    /// Default extraction deadline in seconds.
    pub const EXTRACTION_TIMEOUT_SECS: u64 = 300;

    /// Default file name announced in `Content-Disposition`.
    pub const ATTACHMENT_NAME: &str = "musica.mp3";

    /// Default directory holding in-flight artifacts.
    pub fn temp_dir() -> PathBuf {
        std::env::temp_dir().join("audiograb")
    }
}

/// Upper bound for the extraction deadline in seconds.
const MAX_EXTRACTION_TIMEOUT_SECS: u64 = 3600;

/// App [`state`] configuration.
///
/// [`state`]: crate::service::ServiceState
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Builder)]
#[cfg_attr(feature = "config", derive(Args))]
#[must_use = "config does nothing unless you use it"]
#[builder(
    pattern = "owned",
    setter(into, prefix = "with"),
    build_fn(validate = "Self::validate")
)]
pub struct ServiceConfig {
    /// Directory holding in-flight audio files.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "TEMP_DIR", default_value_os_t = defaults::temp_dir())
    )]
    #[builder(default = "defaults::temp_dir()")]
    pub temp_dir: PathBuf,

    /// Extraction program (yt-dlp or a compatible fork).
    #[cfg_attr(
        feature = "config",
        arg(long, env = "EXTRACTOR_PROGRAM", default_value = defaults::EXTRACTOR_PROGRAM)
    )]
    #[builder(default = "defaults::EXTRACTOR_PROGRAM.into()")]
    pub extractor_program: PathBuf,

    /// Extra arguments passed to the extraction program before the fixed options.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "EXTRACTOR_ARGS", value_delimiter = ',', allow_hyphen_values = true)
    )]
    #[builder(default)]
    pub extractor_args: Vec<String>,

    /// Seconds after which a running extraction is killed.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "EXTRACTION_TIMEOUT", default_value_t = defaults::EXTRACTION_TIMEOUT_SECS)
    )]
    #[builder(default = "defaults::EXTRACTION_TIMEOUT_SECS")]
    pub extraction_timeout: u64,

    /// File name announced to clients in `Content-Disposition`.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "ATTACHMENT_NAME", default_value = defaults::ATTACHMENT_NAME)
    )]
    #[builder(default = "defaults::ATTACHMENT_NAME.to_string()")]
    pub attachment_name: String,
}

impl ServiceConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder::default()
    }

    /// Returns the extraction deadline.
    #[inline]
    pub fn extraction_timeout(&self) -> Duration {
        Duration::from_secs(self.extraction_timeout)
    }

    /// Validates values that may come from the command line or environment.
    pub fn validate(&self) -> Result<()> {
        validate_extractor_program(&self.extractor_program)
            .and_then(|()| validate_extraction_timeout(self.extraction_timeout))
            .and_then(|()| validate_attachment_name(&self.attachment_name))
            .map_err(Error::config)
    }

    /// Builds the extraction tool configuration.
    pub fn extractor_config(&self) -> Result<ExtractorConfig> {
        ExtractorConfig::builder()
            .with_program(self.extractor_program.clone())
            .with_extra_args(self.extractor_args.clone())
            .with_timeout(self.extraction_timeout())
            .build()
            .map_err(|e| Error::config("Invalid extractor configuration").with_source(e))
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            temp_dir: defaults::temp_dir(),
            extractor_program: defaults::EXTRACTOR_PROGRAM.into(),
            extractor_args: Vec::new(),
            extraction_timeout: defaults::EXTRACTION_TIMEOUT_SECS,
            attachment_name: defaults::ATTACHMENT_NAME.to_owned(),
        }
    }
}

impl ServiceConfigBuilder {
    /// Wrapper for builder validation that returns String errors.
    fn validate(builder: &ServiceConfigBuilder) -> Result<(), String> {
        if let Some(program) = &builder.extractor_program {
            validate_extractor_program(program)?;
        }

        if let Some(timeout) = builder.extraction_timeout {
            validate_extraction_timeout(timeout)?;
        }

        if let Some(name) = &builder.attachment_name {
            validate_attachment_name(name)?;
        }

        Ok(())
    }
}

fn validate_extractor_program(program: &std::path::Path) -> Result<(), String> {
    if program.as_os_str().is_empty() {
        return Err("Extractor program cannot be empty".to_string());
    }
    Ok(())
}

fn validate_extraction_timeout(secs: u64) -> Result<(), String> {
    if secs == 0 {
        return Err("Extraction timeout must be at least 1 second".to_string());
    }
    if secs > MAX_EXTRACTION_TIMEOUT_SECS {
        return Err(format!(
            "Extraction timeout cannot exceed {} seconds",
            MAX_EXTRACTION_TIMEOUT_SECS
        ));
    }
    Ok(())
}

/// The name ends up inside a quoted header parameter.
fn validate_attachment_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("Attachment name cannot be empty".to_string());
    }
    if name
        .chars()
        .any(|c| matches!(c, '"' | '\\' | '/') || c.is_control())
    {
        return Err(
            "Attachment name cannot contain quotes, path separators or control characters"
                .to_string(),
        );
    }
    Ok(())
}
