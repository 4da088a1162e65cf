//! Conversions from `audiograb-core` errors into HTTP errors.
//!
//! Internal details such as the extractor's exit status or stderr go into the
//! error context, which is logged but never sent to the client.

use audiograb_core::{Error as CoreError, ErrorKind as CoreErrorKind};

use super::http_error::{Error as HttpError, ErrorKind};

impl From<CoreError> for HttpError<'static> {
    fn from(error: CoreError) -> Self {
        match error.kind() {
            CoreErrorKind::InvalidInput => ErrorKind::BadRequest
                .with_message(
                    error
                        .message
                        .clone()
                        .unwrap_or_else(|| "Invalid input".to_owned()),
                )
                .with_context(error.to_string()),
            CoreErrorKind::ExtractionFailed => ErrorKind::InternalServerError
                .with_message("Audio extraction failed")
                .with_resource("download")
                .with_context(error.to_string()),
            CoreErrorKind::Timeout => ErrorKind::InternalServerError
                .with_message("Audio extraction timed out")
                .with_resource("download")
                .with_context(error.to_string()),
            CoreErrorKind::FileSystem | CoreErrorKind::Configuration => {
                ErrorKind::InternalServerError
                    .with_message("Temporary storage is unavailable")
                    .with_context(error.to_string())
            }
        }
    }
}
