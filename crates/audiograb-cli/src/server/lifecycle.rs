//! Server lifecycle management.
//!
//! Wraps a running server future with startup warnings, uptime accounting
//! and shutdown logging.

use std::future::Future;
use std::io;
use std::time::{Duration, Instant};

use tokio::sync::oneshot;

use crate::config::ServerConfig;
use crate::server::{ServerError, ServerResult, shutdown_signal};
use crate::{TRACING_TARGET_SERVER_SHUTDOWN, TRACING_TARGET_SERVER_STARTUP};

/// Serves with lifecycle management and graceful shutdown.
///
/// # Errors
///
/// Returns [`ServerError::Runtime`] when the server future fails.
pub async fn serve_with_shutdown<F>(
    server_config: &ServerConfig,
    serve_fn: impl FnOnce() -> F,
) -> ServerResult<()>
where
    F: Future<Output = io::Result<()>>,
{
    let start_time = Instant::now();

    log_security_warnings(server_config);
    tracing::info!(
        target: TRACING_TARGET_SERVER_STARTUP,
        addr = %server_config.server_addr(),
        tls = server_config.is_tls_enabled(),
        "Server is ready and listening for connections"
    );

    let result = serve_fn().await;
    handle_result(result, start_time)
}

/// Returns a shutdown future for the server and a deadline future.
///
/// The first resolves on the shutdown signal; the second resolves once
/// `timeout` has elapsed after that signal and never resolves otherwise.
pub fn graceful_shutdown(
    timeout: Duration,
) -> (impl Future<Output = ()>, impl Future<Output = ()>) {
    let (tx, rx) = oneshot::channel::<()>();

    let signal = async move {
        shutdown_signal(timeout).await;
        let _ = tx.send(());
    };

    let deadline = async move {
        if rx.await.is_err() {
            std::future::pending::<()>().await;
        }

        tokio::time::sleep(timeout).await;
        tracing::warn!(
            target: TRACING_TARGET_SERVER_SHUTDOWN,
            timeout_secs = timeout.as_secs(),
            "Shutdown timeout elapsed, dropping remaining connections"
        );
    };

    (signal, deadline)
}

/// Logs security warnings for potentially unsafe configurations.
fn log_security_warnings(config: &ServerConfig) {
    if config.binds_to_all_interfaces() {
        tracing::warn!(
            target: TRACING_TARGET_SERVER_STARTUP,
            "Server bound to all interfaces - ensure firewall is configured"
        );
    }
}

/// Handles the server result and logs appropriate messages.
fn handle_result(result: io::Result<()>, start_time: Instant) -> ServerResult<()> {
    let uptime = start_time.elapsed();

    match result {
        Ok(()) => {
            tracing::info!(
                target: TRACING_TARGET_SERVER_SHUTDOWN,
                uptime_secs = uptime.as_secs(),
                "Shutdown completed"
            );
            Ok(())
        }
        Err(err) => {
            let err = ServerError::Runtime(err);
            tracing::error!(
                target: TRACING_TARGET_SERVER_SHUTDOWN,
                error = %err,
                code = err.error_code(),
                recoverable = err.is_recoverable(),
                uptime_secs = uptime.as_secs(),
                "Fatal error"
            );

            if let Some(suggestion) = err.suggestion() {
                tracing::info!(
                    target: TRACING_TARGET_SERVER_SHUTDOWN,
                    suggestion = suggestion,
                    "Recovery suggestion"
                );
            }

            Err(err)
        }
    }
}
