//! CLI configuration management.
//!
//! This module defines the complete CLI configuration hierarchy:
//!
//! ```text
//! Cli
//! ├── server: ServerConfig          # Host, port, TLS, shutdown
//! ├── middleware: MiddlewareConfig  # CORS, OpenAPI, recovery/timeouts
//! ├── routes: RouteConfig           # Download and health paths
//! ├── service: ServiceConfig        # Temp dir, extractor, attachment name
//! └── logging: LoggingConfig        # Log output format
//! ```
//!
//! All configuration can be provided via CLI arguments or environment variables.
//! Use `--help` to see all available options.
//!
//! # Example
//!
//! ```bash
//! audiograb --port 8080 --extraction-timeout 120
//!
//! # Or via environment variables
//! PORT=8080 EXTRACTION_TIMEOUT=120 audiograb
//! ```

mod logging;
mod middleware;
mod server;

use std::process;

use anyhow::{Context, anyhow};
use audiograb_server::handler::RouteConfig;
use audiograb_server::service::ServiceConfig;
use clap::Parser;
pub use logging::LoggingConfig;
pub use middleware::MiddlewareConfig;
use serde::{Deserialize, Serialize};
pub use server::ServerConfig;

use crate::{TRACING_TARGET_CONFIG, TRACING_TARGET_SERVER_STARTUP};

/// Complete CLI configuration.
#[derive(Debug, Clone, Parser, Serialize, Deserialize)]
#[command(name = "audiograb")]
#[command(about = "HTTP API that extracts audio from video URLs")]
#[command(version)]
pub struct Cli {
    /// Server network and lifecycle configuration.
    #[clap(flatten)]
    pub server: ServerConfig,

    /// HTTP middleware configuration (CORS, OpenAPI, timeouts).
    #[clap(flatten)]
    pub middleware: MiddlewareConfig,

    /// Paths the API routes are mounted at.
    #[clap(flatten)]
    pub routes: RouteConfig,

    /// Temporary storage and extraction tool configuration.
    #[clap(flatten)]
    pub service: ServiceConfig,

    /// Log output configuration.
    #[clap(flatten)]
    pub logging: LoggingConfig,
}

impl Cli {
    /// Loads environment variables from .env file (if enabled) and parses CLI arguments.
    pub fn init() -> Self {
        Self::load_dotenv();
        Self::parse()
    }

    /// Loads environment variables from .env file if the dotenv feature is enabled.
    ///
    /// Must run before parsing so clap's `env` lookups see the loaded values.
    #[cfg(feature = "dotenv")]
    fn load_dotenv() {
        if let Err(err) = dotenvy::dotenv()
            && !err.not_found()
        {
            eprintln!("Warning: failed to load .env file: {err}");
        }
    }

    /// No-op when dotenv feature is disabled.
    #[cfg(not(feature = "dotenv"))]
    fn load_dotenv() {}

    /// Initializes tracing with environment-based filtering.
    pub fn init_tracing(&self) {
        self.logging.init_tracing();
    }

    /// Logs build information at debug level.
    fn log_build_info() {
        tracing::debug!(
            target: TRACING_TARGET_SERVER_STARTUP,
            version = env!("CARGO_PKG_VERSION"),
            pid = process::id(),
            arch = std::env::consts::ARCH,
            os = std::env::consts::OS,
            features = ?Self::enabled_features(),
            "Build information"
        );
    }

    /// Validates all configuration values.
    ///
    /// # Errors
    ///
    /// Returns the first invalid group, with the reason attached as context.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.server
            .validate()
            .context("invalid server configuration")?;

        self.middleware
            .validate()
            .context("invalid middleware configuration")?;

        self.routes
            .validate()
            .map_err(|reason| anyhow!(reason))
            .context("invalid route configuration")?;

        self.service
            .validate()
            .context("invalid service configuration")?;

        self.validate_cross_group()
    }

    /// Checks constraints that span several configuration groups.
    fn validate_cross_group(&self) -> anyhow::Result<()> {
        let extraction = self.service.extraction_timeout;
        let request = self.middleware.recovery.request_timeout;
        if extraction >= request {
            return Err(anyhow!(
                "Extraction timeout ({extraction}s) must be shorter than the request timeout ({request}s)"
            ));
        }

        let docs = self.middleware.openapi.paths();
        if let Some(path) = self.routes.paths().into_iter().find(|p| docs.contains(p)) {
            return Err(anyhow!(
                "Route path '{path}' collides with an OpenAPI documentation path"
            ));
        }

        Ok(())
    }

    /// Logs configuration at startup (no sensitive information).
    pub fn log(&self) {
        Self::log_build_info();
        self.server.log();
        self.middleware.log();

        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            download_path = %self.routes.download_path,
            health_path = %self.routes.health_path,
            "Route configuration"
        );

        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            temp_dir = %self.service.temp_dir.display(),
            extractor = %self.service.extractor_program.display(),
            extractor_args = ?self.service.extractor_args,
            extraction_timeout_secs = self.service.extraction_timeout,
            attachment_name = %self.service.attachment_name,
            "Service configuration"
        );
    }

    /// Returns a list of enabled compile-time features.
    fn enabled_features() -> Vec<&'static str> {
        [
            cfg!(feature = "tls").then_some("tls"),
            cfg!(feature = "dotenv").then_some("dotenv"),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}
