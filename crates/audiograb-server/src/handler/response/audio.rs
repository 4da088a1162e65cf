//! Streamed audio attachment response.

use aide::generate::GenContext;
use aide::openapi::{MediaType, Operation, Response as OpenApiResponse};
use audiograb_core::arena::ArtifactStream;
use axum::body::Body;
use axum::http::HeaderValue;
use axum::http::header::CONTENT_LENGTH;
use axum::response::{IntoResponse, Response};
use axum_extra::response::Attachment;

use crate::utility::AUDIO_MPEG;

/// An extracted audio file sent as an `attachment` download.
///
/// The body is read from the artifact in chunks. The artifact owned by the
/// stream is deleted once the body is fully sent, fails, or is dropped by a
/// disconnecting client.
#[must_use]
#[derive(Debug)]
pub struct AudioAttachment {
    stream: ArtifactStream,
    filename: String,
}

impl AudioAttachment {
    /// Creates a new attachment response.
    pub fn new(stream: ArtifactStream, filename: impl Into<String>) -> Self {
        Self {
            stream,
            filename: filename.into(),
        }
    }

    /// Returns the attachment file name.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Returns the body length in bytes.
    pub fn len(&self) -> u64 {
        self.stream.len()
    }

    /// Returns `true` if the body is empty.
    pub fn is_empty(&self) -> bool {
        self.stream.is_empty()
    }
}

impl IntoResponse for AudioAttachment {
    fn into_response(self) -> Response {
        let len = self.stream.len();

        let mut response = Attachment::new(Body::from_stream(self.stream))
            .filename(self.filename)
            .content_type(AUDIO_MPEG)
            .into_response();

        response
            .headers_mut()
            .insert(CONTENT_LENGTH, HeaderValue::from(len));
        response
    }
}

impl aide::OperationOutput for AudioAttachment {
    type Inner = Self;

    fn operation_response(
        _ctx: &mut GenContext,
        _operation: &mut Operation,
    ) -> Option<OpenApiResponse> {
        let mut response = OpenApiResponse {
            description: "Extracted audio as an MP3 attachment".to_owned(),
            ..Default::default()
        };
        response
            .content
            .insert(AUDIO_MPEG.to_owned(), MediaType::default());
        Some(response)
    }

    fn inferred_responses(
        ctx: &mut GenContext,
        operation: &mut Operation,
    ) -> Vec<(Option<u16>, OpenApiResponse)> {
        Self::operation_response(ctx, operation)
            .map(|response| vec![(Some(200), response)])
            .unwrap_or_default()
    }
}
