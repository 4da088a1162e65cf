//! Common error type definitions.

use strum::{AsRefStr, IntoStaticStr};
use thiserror::Error;

/// Type alias for boxed dynamic errors that can be sent across threads.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Type alias for Results with our custom Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of errors that can occur in audiograb-core operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// Input validation failed.
    InvalidInput,
    /// Filesystem operation on the temporary arena failed.
    FileSystem,
    /// The external extraction tool failed to produce an artifact.
    ExtractionFailed,
    /// The extraction tool did not finish before its deadline.
    Timeout,
    /// Configuration error.
    Configuration,
}

/// A structured error type for audiograb-core operations.
#[derive(Debug, Error)]
#[error("{kind:?}{}", message.as_ref().map(|m| format!(": {}", m)).unwrap_or_default())]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional error message.
    pub message: Option<String>,
    /// Optional source error.
    #[source]
    pub source: Option<BoxedError>,
}

impl Error {
    /// Creates a new error with the given kind.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            source: None,
        }
    }

    /// Adds a message to this error.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Adds a source error to this error.
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Creates a new invalid input error.
    pub fn invalid_input() -> Self {
        Self::new(ErrorKind::InvalidInput)
    }

    /// Creates a new filesystem error.
    pub fn file_system() -> Self {
        Self::new(ErrorKind::FileSystem)
    }

    /// Creates a new extraction failure.
    pub fn extraction_failed() -> Self {
        Self::new(ErrorKind::ExtractionFailed)
    }

    /// Creates a new timeout error.
    pub fn timeout() -> Self {
        Self::new(ErrorKind::Timeout)
    }

    /// Creates a new configuration error.
    pub fn configuration() -> Self {
        Self::new(ErrorKind::Configuration)
    }

    /// Returns the error kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the error kind as a string.
    pub fn kind_str(&self) -> &'static str {
        self.kind.into()
    }

    /// Returns `true` if the failure happened inside the extraction step,
    /// including deadline expiry.
    pub fn is_extraction_failure(&self) -> bool {
        matches!(self.kind, ErrorKind::ExtractionFailed | ErrorKind::Timeout)
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::file_system()
            .with_message(error.to_string())
            .with_source(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_message() {
        let error = Error::extraction_failed().with_message("exit status 1");
        assert_eq!(error.to_string(), "ExtractionFailed: exit status 1");
        assert_eq!(error.kind_str(), "extraction_failed");
    }

    #[test]
    fn io_errors_map_to_file_system() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let error = Error::from(io);
        assert_eq!(error.kind(), ErrorKind::FileSystem);
        assert!(std::error::Error::source(&error).is_some());
    }

    #[test]
    fn timeout_counts_as_extraction_failure() {
        assert!(Error::timeout().is_extraction_failure());
        assert!(!Error::invalid_input().is_extraction_failure());
    }
}
