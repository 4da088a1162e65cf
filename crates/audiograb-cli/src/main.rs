#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod config;
mod server;

use std::future::Future;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use audiograb_server::handler::routes;
use audiograb_server::middleware::{
    RouterObservabilityExt, RouterOpenApiExt, RouterRecoveryExt, RouterSecurityExt,
    SecurityHeadersConfig,
};
use audiograb_server::service::ServiceState;
use axum::Router;
use tokio::runtime::{Builder, Runtime};

use crate::config::Cli;

// Tracing target constants
pub const TRACING_TARGET_SERVER_STARTUP: &str = "audiograb_cli::server::startup";
pub const TRACING_TARGET_SERVER_SHUTDOWN: &str = "audiograb_cli::server::shutdown";
pub const TRACING_TARGET_CONFIG: &str = "audiograb_cli::config";

/// Upper bound for dropping leftover tasks once the server has stopped.
const RUNTIME_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

fn main() -> ExitCode {
    let runtime = match Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            eprintln!("Error: failed to start the async runtime: {error}");
            return ExitCode::FAILURE;
        }
    };

    block_on_then_shutdown(runtime, async { report(run().await) })
}

/// Drives `future` to completion, then shuts the runtime down.
///
/// Connection tasks still alive after a shutdown deadline are dropped here,
/// which releases their artifacts and kills their extraction processes
/// before the process exits.
fn block_on_then_shutdown<T>(runtime: Runtime, future: impl Future<Output = T>) -> T {
    let output = runtime.block_on(future);
    runtime.shutdown_timeout(RUNTIME_SHUTDOWN_TIMEOUT);
    output
}

/// Logs the outcome of [`run`] and maps it to an exit code.
fn report(result: anyhow::Result<()>) -> ExitCode {
    let Err(error) = result else {
        tracing::info!(
            target: TRACING_TARGET_SERVER_SHUTDOWN,
            "application terminated successfully"
        );
        return ExitCode::SUCCESS;
    };

    if tracing::enabled!(tracing::Level::ERROR) {
        tracing::error!(
            target: TRACING_TARGET_SERVER_SHUTDOWN,
            error = %error,
            "application terminated with error"
        );
    } else {
        eprintln!("Error: {error:#}");
    }

    ExitCode::FAILURE
}

/// Main application entry point.
async fn run() -> anyhow::Result<()> {
    let cli = Cli::init();
    cli.init_tracing();

    tracing::info!(
        target: TRACING_TARGET_SERVER_STARTUP,
        version = env!("CARGO_PKG_VERSION"),
        "starting audiograb server"
    );

    cli.log();
    cli.validate()?;

    let state = ServiceState::from_config(&cli.service)
        .await
        .context("failed to create service state")?;
    let router = create_router(state, &cli);

    server::serve(router, cli.server).await?;

    Ok(())
}

/// Creates the router with all middleware layers applied.
///
/// Middleware is applied in reverse order (last added = outermost):
/// 1. Recovery (outermost) - catches panics and enforces timeouts
/// 2. Observability - request IDs and tracing spans
/// 3. Security - CORS, security headers, body limit, compression
/// 4. Routes (innermost) - download, health and documentation
fn create_router(state: ServiceState, cli: &Cli) -> Router {
    let middleware = &cli.middleware;
    let api_routes: Router = routes(&cli.routes)
        .with_state(state)
        .with_open_api(middleware.openapi.clone());

    api_routes
        .with_security(&middleware.cors, &SecurityHeadersConfig::default())
        .with_observability()
        .with_recovery(&middleware.recovery)
}
