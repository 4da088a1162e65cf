//! `yt-dlp` process invocation.

use std::ffi::OsString;
use std::io;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Instant;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};

use super::{AudioExtractor, ExtractorConfig};
use crate::{Error, Result, TRACING_TARGET_EXTRACT};

/// Extracts audio by running `yt-dlp` as a child process.
///
/// The tool is always invoked with an argument vector, never through a shell:
///
/// ```text
/// <program> <extra args..> -x --audio-format <fmt> --no-playlist -o <output> -- <url>
/// ```
///
/// The URL follows `--` so a value starting with `-` is never parsed as an
/// option. On Unix the child leads its own process group, and the whole
/// group (including the ffmpeg post-processor) is killed when the deadline
/// expires or the extraction future is dropped.
#[derive(Debug, Clone)]
pub struct YtDlpExtractor {
    config: ExtractorConfig,
}

impl YtDlpExtractor {
    /// Creates a new extractor.
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    /// Returns the extractor configuration.
    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Builds the command extracting `source_url` into `output`.
    pub fn command(&self, source_url: &str, output: &Path) -> Command {
        let mut command = Command::new(&self.config.program);
        command
            .args(&self.config.extra_args)
            .arg("-x")
            .arg("--audio-format")
            .arg(&self.config.audio_format)
            .arg("--no-playlist")
            .arg("-o")
            .arg(output_template(output))
            .arg("--")
            .arg(source_url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        #[cfg(unix)]
        command.process_group(0);

        command
    }

    fn stderr_tail(&self, stderr: &[u8]) -> String {
        let start = stderr.len().saturating_sub(self.config.stderr_tail);
        String::from_utf8_lossy(&stderr[start..]).trim().to_string()
    }
}

#[async_trait]
impl AudioExtractor for YtDlpExtractor {
    async fn extract(&self, source_url: &str, output: &Path) -> Result<()> {
        let program = self.config.program.display().to_string();
        let started = Instant::now();

        tracing::info!(
            target: TRACING_TARGET_EXTRACT,
            program = %program,
            source_url,
            output = %output.display(),
            "Starting audio extraction"
        );

        let mut child = self.command(source_url, output).spawn().map_err(|e| {
            tracing::error!(
                target: TRACING_TARGET_EXTRACT,
                program = %program,
                error = %e,
                "Failed to spawn extraction process"
            );
            Error::extraction_failed()
                .with_message(format!("failed to spawn {program}"))
                .with_source(e)
        })?;

        let pid = child.id();
        // Dropped before `child`, while the group leader is still unreaped.
        let mut group = ProcessGroup::new(pid);

        let waited = tokio::time::timeout(self.config.timeout, wait_with_stderr(&mut child)).await;

        let Ok(result) = waited else {
            group.kill();
            if let Err(e) = child.kill().await {
                tracing::debug!(
                    target: TRACING_TARGET_EXTRACT,
                    pid,
                    error = %e,
                    "Extraction process already gone"
                );
            }

            tracing::warn!(
                target: TRACING_TARGET_EXTRACT,
                program = %program,
                pid,
                timeout_secs = self.config.timeout.as_secs_f64(),
                "Extraction deadline expired, process group killed"
            );
            return Err(Error::timeout().with_message(format!(
                "{program} did not finish within {:?}",
                self.config.timeout
            )));
        };

        // Stragglers outliving the tool must not write into the arena.
        group.kill();

        let (status, stderr) = result.map_err(|e| {
            Error::extraction_failed()
                .with_message(format!("failed to wait for {program}"))
                .with_source(e)
        })?;

        let elapsed_ms = started.elapsed().as_millis() as u64;

        if !status.success() {
            let stderr = self.stderr_tail(&stderr);
            tracing::warn!(
                target: TRACING_TARGET_EXTRACT,
                program = %program,
                pid,
                exit_code = ?status.code(),
                elapsed_ms,
                stderr = %stderr,
                "Extraction process failed"
            );
            return Err(Error::extraction_failed()
                .with_message(format!("{program} exited with {status}: {stderr}")));
        }

        if !fs::try_exists(output).await.unwrap_or(false) {
            tracing::warn!(
                target: TRACING_TARGET_EXTRACT,
                program = %program,
                output = %output.display(),
                "Extraction process succeeded without producing output"
            );
            return Err(Error::extraction_failed()
                .with_message(format!("{program} exited successfully but wrote no output")));
        }

        tracing::info!(
            target: TRACING_TARGET_EXTRACT,
            program = %program,
            pid,
            elapsed_ms,
            "Audio extraction finished"
        );

        Ok(())
    }
}

/// Waits for `child` while draining its stderr pipe.
///
/// The child stays owned by the caller, so it can still be killed if this
/// future is cancelled.
async fn wait_with_stderr(child: &mut Child) -> io::Result<(ExitStatus, Vec<u8>)> {
    let pipe = child.stderr.take();
    let read_stderr = async move {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            pipe.read_to_end(&mut buf).await?;
        }
        Ok::<_, io::Error>(buf)
    };

    let (status, stderr) = tokio::join!(child.wait(), read_stderr);
    Ok((status?, stderr?))
}

/// Process group led by an extraction child.
///
/// Sends `SIGKILL` to every member when killed or dropped, so processes the
/// tool spawned itself are stopped together with it. A no-op on platforms
/// without process groups.
#[derive(Debug)]
struct ProcessGroup {
    pgid: Option<u32>,
}

impl ProcessGroup {
    fn new(pgid: Option<u32>) -> Self {
        Self { pgid }
    }

    /// Kills the group once; later calls do nothing.
    fn kill(&mut self) {
        let Some(pgid) = self.pgid.take() else {
            return;
        };

        #[cfg(unix)]
        kill_group(pgid);

        #[cfg(not(unix))]
        let _ = pgid;
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        self.kill();
    }
}

#[cfg(unix)]
fn kill_group(pgid: u32) {
    use nix::errno::Errno;
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pgid) else {
        return;
    };

    match killpg(Pid::from_raw(raw), Signal::SIGKILL) {
        Ok(()) => tracing::debug!(
            target: TRACING_TARGET_EXTRACT,
            pgid,
            "Extraction process group killed"
        ),
        Err(Errno::ESRCH) => {}
        Err(e) => tracing::warn!(
            target: TRACING_TARGET_EXTRACT,
            pgid,
            error = %e,
            "Failed to kill extraction process group"
        ),
    }
}

/// `-o` is an output template for the tool, so literal `%` must be doubled.
fn output_template(path: &Path) -> OsString {
    match path.to_str() {
        Some(path) => path.replace('%', "%%").into(),
        None => path.as_os_str().to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::OsStr;
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn command_uses_argument_vector() {
        let extractor = YtDlpExtractor::new(ExtractorConfig::default());
        let command = extractor.command("-rf https://x", Path::new("/tmp/a/audio_1.mp3"));
        let std = command.as_std();

        assert_eq!(std.get_program(), OsStr::new("yt-dlp"));
        let args: Vec<_> = std.get_args().collect();
        assert_eq!(
            args,
            [
                "-x",
                "--audio-format",
                "mp3",
                "--no-playlist",
                "-o",
                "/tmp/a/audio_1.mp3",
                "--",
                "-rf https://x",
            ]
            .map(OsStr::new)
        );
    }

    #[test]
    fn extra_args_precede_fixed_options() {
        let config = ExtractorConfig::builder()
            .with_program("/opt/bin/yt-dlp")
            .with_extra_args(vec!["--cookies".to_string(), "/etc/cookies.txt".to_string()])
            .build()
            .unwrap();
        let extractor = YtDlpExtractor::new(config);
        let command = extractor.command("https://example.com/v", Path::new("/t/out.mp3"));
        let args: Vec<_> = command.as_std().get_args().collect();

        assert_eq!(args[0], OsStr::new("--cookies"));
        assert_eq!(args[1], OsStr::new("/etc/cookies.txt"));
        assert_eq!(args[2], OsStr::new("-x"));
        assert_eq!(args.last().copied(), Some(OsStr::new("https://example.com/v")));
    }

    #[test]
    fn percent_in_output_path_is_escaped() {
        let template = output_template(&PathBuf::from("/tmp/100%/audio_1.mp3"));
        assert_eq!(template, OsString::from("/tmp/100%%/audio_1.mp3"));
    }

    #[test]
    fn stderr_tail_keeps_last_bytes() {
        let config = ExtractorConfig::builder()
            .with_stderr_tail(5usize)
            .build()
            .unwrap();
        let extractor = YtDlpExtractor::new(config);
        assert_eq!(extractor.stderr_tail(b"ERROR: boom\n"), "boom");
    }

    #[tokio::test]
    async fn spawn_failure_is_extraction_failure() {
        let config = ExtractorConfig::builder()
            .with_program("/nonexistent/audiograb/yt-dlp")
            .build()
            .unwrap();
        let extractor = YtDlpExtractor::new(config);

        let dir = tempfile::tempdir().unwrap();
        let error = extractor
            .extract("https://example.com/v", &dir.path().join("out.mp3"))
            .await
            .unwrap_err();
        assert_eq!(error.kind(), crate::ErrorKind::ExtractionFailed);
    }

    #[cfg(unix)]
    mod stub {
        use std::time::Duration;

        use super::*;
        use crate::ErrorKind;
        use crate::arena::TempArena;

        /// Shell prologue picking `-o <path>` and the URL after `--`
        /// out of the arguments the extractor passes.
        const PARSE_ARGS: &str = r#"out=""; url=""
while [ $# -gt 0 ]; do
  case "$1" in
    -o) out="$2"; shift 2 ;;
    --) url="$2"; shift 2 ;;
    *) shift ;;
  esac
done
"#;

        fn stub_extractor(body: &str, timeout: Duration) -> YtDlpExtractor {
            let config = ExtractorConfig::builder()
                .with_program("sh")
                .with_extra_args(vec![
                    "-c".to_string(),
                    format!("{PARSE_ARGS}{body}"),
                    "ytdlp-stub".to_string(),
                ])
                .with_timeout(timeout)
                .build()
                .unwrap();
            YtDlpExtractor::new(config)
        }

        #[tokio::test]
        async fn successful_run_writes_output() -> crate::Result<()> {
            let root = tempfile::tempdir()?;
            let arena = TempArena::open(root.path()).await?;
            let artifact = arena.allocate().await?;

            let extractor = stub_extractor(
                r#"printf '0123456789' > "$out""#,
                Duration::from_secs(10),
            );
            extractor
                .extract("https://example.com/video", artifact.path())
                .await?;

            assert_eq!(std::fs::read(artifact.path())?, b"0123456789");
            Ok(())
        }

        #[tokio::test]
        async fn dash_prefixed_url_arrives_as_positional() -> crate::Result<()> {
            let root = tempfile::tempdir()?;
            let arena = TempArena::open(root.path()).await?;
            let artifact = arena.allocate().await?;

            let extractor =
                stub_extractor(r#"printf '%s' "$url" > "$out""#, Duration::from_secs(10));
            extractor.extract("--exec=rm", artifact.path()).await?;

            assert_eq!(std::fs::read(artifact.path())?, b"--exec=rm");
            Ok(())
        }

        #[tokio::test]
        async fn non_zero_exit_fails_and_partial_file_is_reclaimed() -> crate::Result<()> {
            let root = tempfile::tempdir()?;
            let arena = TempArena::open(root.path()).await?;
            let artifact = arena.allocate().await?;
            let path = artifact.path().to_path_buf();

            let extractor = stub_extractor(
                r#"printf 'partial' > "$out"; echo 'ERROR: Unsupported URL' >&2; exit 1"#,
                Duration::from_secs(10),
            );
            let error = extractor
                .extract("https://example.com/nope", &path)
                .await
                .unwrap_err();

            assert_eq!(error.kind(), ErrorKind::ExtractionFailed);
            assert!(error.to_string().contains("Unsupported URL"));
            assert!(path.exists());

            drop(artifact);
            assert!(!path.exists());
            Ok(())
        }

        #[tokio::test]
        async fn zero_exit_without_output_fails() -> crate::Result<()> {
            let root = tempfile::tempdir()?;
            let arena = TempArena::open(root.path()).await?;
            let artifact = arena.allocate().await?;

            let extractor = stub_extractor("exit 0", Duration::from_secs(10));
            let error = extractor
                .extract("https://example.com/video", artifact.path())
                .await
                .unwrap_err();

            assert_eq!(error.kind(), ErrorKind::ExtractionFailed);
            Ok(())
        }

        #[tokio::test]
        async fn hanging_process_is_killed_at_deadline() -> crate::Result<()> {
            let root = tempfile::tempdir()?;
            let arena = TempArena::open(root.path()).await?;
            let artifact = arena.allocate().await?;
            let path = artifact.path().to_path_buf();

            let extractor = stub_extractor(
                r#"printf 'partial' > "$out"; exec sleep 30"#,
                Duration::from_millis(500),
            );

            let started = Instant::now();
            let error = extractor
                .extract("https://example.com/slow", &path)
                .await
                .unwrap_err();

            assert_eq!(error.kind(), ErrorKind::Timeout);
            assert!(error.is_extraction_failure());
            assert!(started.elapsed() < Duration::from_secs(10));

            drop(artifact);
            assert!(!path.exists());
            Ok(())
        }

        /// Body that forks a writer into the background, the way yt-dlp
        /// hands post-processing to ffmpeg, then keeps running.
        const FORKS_LATE_WRITER: &str = r#"( sleep 1; printf 'late' > "$out" ) &
exec sleep 30"#;

        #[tokio::test]
        async fn deadline_kills_background_writers() -> crate::Result<()> {
            let root = tempfile::tempdir()?;
            let arena = TempArena::open(root.path()).await?;
            let artifact = arena.allocate().await?;
            let path = artifact.path().to_path_buf();

            let extractor = stub_extractor(FORKS_LATE_WRITER, Duration::from_millis(300));
            let error = extractor
                .extract("https://example.com/slow", &path)
                .await
                .unwrap_err();
            assert_eq!(error.kind(), ErrorKind::Timeout);

            drop(artifact);
            tokio::time::sleep(Duration::from_secs(2)).await;

            let leftovers: Vec<_> = std::fs::read_dir(arena.dir())?
                .map(|entry| entry.map(|e| e.file_name()))
                .collect::<std::io::Result<_>>()?;
            assert!(leftovers.is_empty(), "arena not empty: {leftovers:?}");
            Ok(())
        }

        #[tokio::test]
        async fn dropped_extraction_kills_background_writers() -> crate::Result<()> {
            let root = tempfile::tempdir()?;
            let arena = TempArena::open(root.path()).await?;
            let artifact = arena.allocate().await?;
            let path = artifact.path().to_path_buf();

            let extractor = stub_extractor(FORKS_LATE_WRITER, Duration::from_secs(30));
            let cancelled = tokio::time::timeout(
                Duration::from_millis(300),
                extractor.extract("https://example.com/slow", &path),
            )
            .await;
            assert!(cancelled.is_err());

            drop(artifact);
            tokio::time::sleep(Duration::from_secs(2)).await;

            assert_eq!(std::fs::read_dir(arena.dir())?.count(), 0);
            Ok(())
        }
    }
}
