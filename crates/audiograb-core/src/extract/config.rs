use std::path::PathBuf;
use std::time::Duration;

use derive_builder::Builder;

/// Default values for configuration options.
mod defaults {
    use std::time::Duration;

    /// Default extraction program, resolved through `PATH`.
    pub const PROGRAM: &str = "yt-dlp";

    /// Default output audio format.
    pub const AUDIO_FORMAT: &str = "mp3";

    /// Default extraction deadline.
    pub const TIMEOUT: Duration = Duration::from_secs(300);

    /// Default number of trailing stderr bytes kept for diagnostics.
    pub const STDERR_TAIL: usize = 2048;
}

/// Configuration of the external extraction tool.
#[derive(Debug, Clone, Builder)]
#[must_use = "config does nothing unless you use it"]
#[builder(
    pattern = "owned",
    setter(into, prefix = "with"),
    build_fn(validate = "Self::validate")
)]
pub struct ExtractorConfig {
    /// Program to execute.
    #[builder(default = "defaults::PROGRAM.into()")]
    pub program: PathBuf,

    /// Arguments placed before the fixed extraction options,
    /// e.g. `--ffmpeg-location` or `--cookies`.
    #[builder(default)]
    pub extra_args: Vec<String>,

    /// Target audio format passed to `--audio-format`.
    #[builder(default = "defaults::AUDIO_FORMAT.to_string()")]
    pub audio_format: String,

    /// Deadline after which the process is killed.
    #[builder(default = "defaults::TIMEOUT")]
    pub timeout: Duration,

    /// Trailing stderr bytes kept for failure diagnostics.
    #[builder(default = "defaults::STDERR_TAIL")]
    pub stderr_tail: usize,
}

impl ExtractorConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> ExtractorConfigBuilder {
        ExtractorConfigBuilder::default()
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            program: defaults::PROGRAM.into(),
            extra_args: Vec::new(),
            audio_format: defaults::AUDIO_FORMAT.to_string(),
            timeout: defaults::TIMEOUT,
            stderr_tail: defaults::STDERR_TAIL,
        }
    }
}

impl ExtractorConfigBuilder {
    fn validate(builder: &ExtractorConfigBuilder) -> Result<(), String> {
        if let Some(program) = &builder.program
            && program.as_os_str().is_empty()
        {
            return Err("Extraction program cannot be empty".to_string());
        }

        if let Some(timeout) = builder.timeout
            && timeout.is_zero()
        {
            return Err("Extraction timeout must be greater than zero".to_string());
        }

        if let Some(format) = &builder.audio_format
            && format.trim().is_empty()
        {
            return Err("Audio format cannot be empty".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults_match_default() {
        let built = ExtractorConfig::builder().build().unwrap();
        let default = ExtractorConfig::default();

        assert_eq!(built.program, default.program);
        assert_eq!(built.audio_format, "mp3");
        assert_eq!(built.timeout, Duration::from_secs(300));
        assert!(built.extra_args.is_empty());
    }

    #[test]
    fn rejects_zero_timeout() {
        let result = ExtractorConfig::builder()
            .with_timeout(Duration::ZERO)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn rejects_empty_program() {
        let result = ExtractorConfig::builder().with_program("").build();
        assert!(result.is_err());
    }
}
