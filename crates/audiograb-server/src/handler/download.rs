//! Audio download handler.
//!
//! Validates the body, reserves a temporary artifact, runs the extraction
//! tool into it and streams the result back as an MP3 attachment. The
//! artifact is deleted on every exit path by its guard.

use std::sync::Arc;
use std::time::Instant;

use aide::axum::ApiRouter;
use aide::transform::TransformOperation;
use audiograb_core::arena::TempArena;
use audiograb_core::extract::AudioExtractor;
use axum::extract::State;

use crate::extract::{Json, ValidateJson};
use crate::handler::request::DownloadRequest;
use crate::handler::response::{AudioAttachment, ErrorResponse};
use crate::handler::{Error, Result};
use crate::service::{DownloadOptions, ServiceState};

/// Tracing target for download operations.
const TRACING_TARGET: &str = "audiograb_server::handler::download";

/// Extracts the audio track of a video and returns it as an MP3 attachment.
#[tracing::instrument(skip_all, fields(url = %request.url))]
async fn download_audio(
    State(arena): State<TempArena>,
    State(extractor): State<Arc<dyn AudioExtractor>>,
    State(options): State<DownloadOptions>,
    ValidateJson(request): ValidateJson<DownloadRequest>,
) -> Result<AudioAttachment> {
    tracing::debug!(target: TRACING_TARGET, "Audio download requested");

    let artifact = arena.allocate().await?;
    let started = Instant::now();

    if let Err(error) = extractor.extract(&request.url, artifact.path()).await {
        tracing::error!(
            target: TRACING_TARGET,
            artifact_id = %artifact.id(),
            kind = error.kind_str(),
            error = %error,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Audio extraction failed"
        );
        return Err(Error::from(error));
    }

    let stream = artifact.into_stream().await?;

    tracing::info!(
        target: TRACING_TARGET,
        bytes = stream.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Audio extracted, streaming attachment"
    );

    Ok(AudioAttachment::new(stream, options.attachment_name()))
}

fn download_audio_docs(op: TransformOperation) -> TransformOperation {
    op.summary("Download audio")
        .description(
            "Extracts the audio track of the given video URL and returns it as an MP3 \
            attachment. The temporary file is deleted once the response is sent.",
        )
        .response::<200, AudioAttachment>()
        .response::<400, Json<ErrorResponse>>()
        .response::<413, Json<ErrorResponse>>()
        .response::<500, Json<ErrorResponse>>()
}

/// Returns a [`Router`] with the download route mounted at `path`.
///
/// [`Router`]: axum::routing::Router
pub fn routes(path: &str) -> ApiRouter<ServiceState> {
    use aide::axum::routing::*;

    ApiRouter::new()
        .api_route(path, post_with(download_audio, download_audio_docs))
        .with_path_items(|item| item.tag("Download"))
}

#[cfg(test)]
mod tests {
    use std::future::IntoFuture;

    use axum::http::StatusCode;
    use axum::http::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
    use serde_json::json;

    use crate::handler::test::{STUB_AUDIO, StubBehavior, count_entries, create_test_server};

    const DOWNLOAD_PATH: &str = "/api/baixar";

    #[tokio::test]
    async fn successful_download_streams_audio_and_cleans_up() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let server = create_test_server(root.path(), StubBehavior::Succeed).await?;

        let response = server
            .post(DOWNLOAD_PATH)
            .json(&json!({ "url": "https://example.com/video" }))
            .await;

        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(response.as_bytes().as_ref(), STUB_AUDIO);

        let headers = response.headers();
        assert_eq!(headers[CONTENT_TYPE], "audio/mpeg");
        assert_eq!(headers[CONTENT_DISPOSITION], "attachment; filename=\"musica.mp3\"");
        assert_eq!(headers[CONTENT_LENGTH], STUB_AUDIO.len().to_string().as_str());

        assert_eq!(count_entries(root.path())?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn invalid_bodies_are_rejected_without_side_effects() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let server = create_test_server(root.path(), StubBehavior::Succeed).await?;

        let bodies = [
            json!({}),
            json!({ "url": null }),
            json!({ "url": 42 }),
            json!({ "url": "" }),
            json!({ "url": ["https://example.com/video"] }),
            json!("https://example.com/video"),
        ];

        for body in bodies {
            let response = server.post(DOWNLOAD_PATH).json(&body).await;
            assert_eq!(response.status_code(), StatusCode::BAD_REQUEST, "{body}");

            let error: serde_json::Value = response.json();
            assert_eq!(error["name"], "bad_request");
            assert!(error["error"].is_string());
        }

        assert_eq!(count_entries(root.path())?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn empty_url_reports_the_field() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let server = create_test_server(root.path(), StubBehavior::Succeed).await?;

        let response = server.post(DOWNLOAD_PATH).json(&json!({ "url": "" })).await;
        let error: serde_json::Value = response.json();
        assert_eq!(
            error["error"],
            "Invalid request data. Field 'url': must be a non-empty string"
        );
        Ok(())
    }

    #[tokio::test]
    async fn malformed_json_and_wrong_content_type_are_rejected() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let server = create_test_server(root.path(), StubBehavior::Succeed).await?;

        let malformed = server
            .post(DOWNLOAD_PATH)
            .bytes("{\"url\": ".into())
            .content_type("application/json")
            .await;
        assert_eq!(malformed.status_code(), StatusCode::BAD_REQUEST);

        let plain_text = server
            .post(DOWNLOAD_PATH)
            .text(r#"{"url":"https://example.com/video"}"#)
            .await;
        assert_eq!(plain_text.status_code(), StatusCode::BAD_REQUEST);

        assert_eq!(count_entries(root.path())?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn extraction_failure_answers_500_without_audio() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let server = create_test_server(root.path(), StubBehavior::Fail).await?;

        let response = server
            .post(DOWNLOAD_PATH)
            .json(&json!({ "url": "https://example.com/video" }))
            .await;

        assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_ne!(response.headers()[CONTENT_TYPE], "audio/mpeg");

        let error: serde_json::Value = response.json();
        assert_eq!(error["name"], "internal_server_error");
        let message = error["error"].as_str().unwrap_or_default();
        assert!(message.contains("Audio extraction failed"));
        assert!(!message.contains("Unsupported URL"));

        assert_eq!(count_entries(root.path())?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn partial_output_is_removed_after_failure() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let server = create_test_server(root.path(), StubBehavior::FailAfterPartialWrite).await?;

        let response = server
            .post(DOWNLOAD_PATH)
            .json(&json!({ "url": "https://example.com/video" }))
            .await;

        assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(count_entries(root.path())?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_downloads_do_not_interfere() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let server = create_test_server(root.path(), StubBehavior::Succeed).await?;

        let requests = (0..16).map(|i| {
            server
                .post(DOWNLOAD_PATH)
                .json(&json!({ "url": format!("https://example.com/video/{i}") }))
                .into_future()
        });
        let responses = futures::future::join_all(requests).await;

        for response in responses {
            assert_eq!(response.status_code(), StatusCode::OK);
            assert_eq!(response.as_bytes().as_ref(), STUB_AUDIO);
        }

        assert_eq!(count_entries(root.path())?, 0);
        Ok(())
    }

    #[cfg(unix)]
    mod yt_dlp_stub {
        use std::sync::Arc;

        use audiograb_core::extract::{ExtractorConfig, YtDlpExtractor};

        use super::*;
        use crate::handler::test::{create_test_server_with_state, create_test_state};

        const PARSE_ARGS: &str = r#"out=""; url=""
while [ $# -gt 0 ]; do
  case "$1" in
    -o) out="$2"; shift 2 ;;
    --) url="$2"; shift 2 ;;
    *) shift ;;
  esac
done
"#;

        async fn server_with_script(
            dir: &std::path::Path,
            body: &str,
        ) -> anyhow::Result<axum_test::TestServer> {
            let config = ExtractorConfig::builder()
                .with_program("sh")
                .with_extra_args(vec![
                    "-c".to_owned(),
                    format!("{PARSE_ARGS}{body}"),
                    "ytdlp-stub".to_owned(),
                ])
                .with_timeout(std::time::Duration::from_secs(10))
                .build()?;

            let state = create_test_state(dir, Arc::new(YtDlpExtractor::new(config))).await?;
            create_test_server_with_state(state)
        }

        #[tokio::test]
        async fn ten_byte_tool_output_is_served() -> anyhow::Result<()> {
            let root = tempfile::tempdir()?;
            let server =
                server_with_script(root.path(), r#"printf '0123456789' > "$out""#).await?;

            let response = server
                .post(DOWNLOAD_PATH)
                .json(&json!({ "url": "https://example.com/video" }))
                .await;

            assert_eq!(response.status_code(), StatusCode::OK);
            assert_eq!(response.as_bytes().as_ref(), b"0123456789");
            assert_eq!(count_entries(root.path())?, 0);
            Ok(())
        }

        #[tokio::test]
        async fn failing_tool_answers_500() -> anyhow::Result<()> {
            let root = tempfile::tempdir()?;
            let server = server_with_script(
                root.path(),
                r#"printf 'half' > "$out"; echo 'ERROR: no video' >&2; exit 1"#,
            )
            .await?;

            let response = server
                .post(DOWNLOAD_PATH)
                .json(&json!({ "url": "https://example.com/missing" }))
                .await;

            assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(count_entries(root.path())?, 0);
            Ok(())
        }

        #[tokio::test]
        async fn dash_prefixed_url_is_not_an_option() -> anyhow::Result<()> {
            let root = tempfile::tempdir()?;
            let server = server_with_script(
                root.path(),
                r#"[ "$url" = "--exec=touch pwned" ] && printf 'ok' > "$out""#,
            )
            .await?;

            let response = server
                .post(DOWNLOAD_PATH)
                .json(&json!({ "url": "--exec=touch pwned" }))
                .await;

            assert_eq!(response.status_code(), StatusCode::OK);
            assert_eq!(response.as_bytes().as_ref(), b"ok");
            Ok(())
        }
    }
}
