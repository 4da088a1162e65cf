//! HTTP server startup.

use std::future::IntoFuture;

use axum::Router;
use tokio::net::TcpListener;

use crate::TRACING_TARGET_SERVER_STARTUP;
use crate::config::ServerConfig;
use crate::server::lifecycle::{graceful_shutdown, serve_with_shutdown};
use crate::server::{ServerError, ServerResult};

/// Binds a TCP listener and serves `app` until a shutdown signal arrives.
///
/// In-flight requests are given the configured shutdown timeout to finish.
///
/// # Errors
///
/// Returns [`ServerError::BindError`] if the address cannot be bound, or
/// [`ServerError::Runtime`] if the server fails while running.
pub async fn serve_http(app: Router, server_config: ServerConfig) -> ServerResult<()> {
    let server_addr = server_config.server_addr();

    let listener = TcpListener::bind(server_addr).await.map_err(|err| {
        tracing::error!(
            target: TRACING_TARGET_SERVER_STARTUP,
            addr = %server_addr,
            error = %err,
            "Failed to bind to address"
        );
        ServerError::bind_error(server_addr, err)
    })?;

    let (signal, deadline) = graceful_shutdown(server_config.shutdown_timeout());

    serve_with_shutdown(&server_config, move || async move {
        let server = axum::serve(listener, app)
            .with_graceful_shutdown(signal)
            .into_future();

        tokio::select! {
            result = server => result,
            () = deadline => Ok(()),
        }
    })
    .await
}
