//! Middleware configuration for the HTTP server.
//!
//! Groups the CORS, OpenAPI documentation and recovery settings exported by
//! `audiograb-server`, all of which accept CLI arguments and environment
//! variables.
//!
//! # Example
//!
//! ```bash
//! audiograb --cors-origins "https://example.com" --request-timeout 900
//! ```

use anyhow::{Result as AnyhowResult, anyhow};
use audiograb_server::middleware::{CorsConfig, OpenApiConfig, RecoveryConfig};
use clap::Args;
use serde::{Deserialize, Serialize};

use crate::TRACING_TARGET_CONFIG;

/// Middleware configuration combining CORS, OpenAPI, and recovery settings.
#[derive(Debug, Clone, Args, Serialize, Deserialize)]
pub struct MiddlewareConfig {
    /// CORS (Cross-Origin Resource Sharing) configuration.
    #[clap(flatten)]
    pub cors: CorsConfig,

    /// OpenAPI documentation configuration.
    ///
    /// Configures the paths where the OpenAPI JSON specification
    /// and Scalar UI are served.
    #[clap(flatten)]
    pub openapi: OpenApiConfig,

    /// Recovery middleware configuration.
    #[clap(flatten)]
    pub recovery: RecoveryConfig,
}

impl MiddlewareConfig {
    /// Validates the request timeout and documentation paths.
    pub fn validate(&self) -> AnyhowResult<()> {
        self.recovery.validate().map_err(|reason| anyhow!(reason))?;

        let paths = self.openapi.paths();
        for path in &paths {
            if !path.starts_with('/') {
                return Err(anyhow!("OpenAPI path '{path}' must start with '/'"));
            }
        }

        if paths[1..].contains(&self.openapi.open_api_json.as_str()) {
            return Err(anyhow!(
                "OpenAPI JSON and Scalar UI cannot share the path '{}'",
                self.openapi.open_api_json
            ));
        }

        Ok(())
    }

    /// Logs middleware configuration at info level.
    pub fn log(&self) {
        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            origins = ?self.cors.allowed_origins,
            credentials = self.cors.allows_credentials(),
            max_age_secs = self.cors.max_age_seconds,
            "CORS configuration"
        );

        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            openapi_path = %self.openapi.open_api_json,
            scalar_path = %self.openapi.scalar_ui,
            scalar_alias = ?self.openapi.scalar_alias(),
            "OpenAPI configuration"
        );

        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            request_timeout_secs = self.recovery.request_timeout,
            "Recovery configuration"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> MiddlewareConfig {
        MiddlewareConfig {
            cors: CorsConfig::default(),
            openapi: OpenApiConfig::default(),
            recovery: RecoveryConfig::default(),
        }
    }

    #[test]
    fn default_middleware_is_valid() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn reject_zero_request_timeout() {
        let mut zero = config();
        zero.recovery = RecoveryConfig::with_timeout_secs(0);
        assert!(zero.validate().is_err());
    }

    #[test]
    fn reject_shared_documentation_paths() {
        let mut shared = config();
        shared.openapi.scalar_ui = shared.openapi.open_api_json.clone();
        assert!(shared.validate().is_err());

        let mut relative = config();
        relative.openapi.scalar_ui = "docs".to_owned();
        assert!(relative.validate().is_err());

        let mut alias = config();
        alias.openapi.scalar_ui_alias = alias.openapi.open_api_json.clone();
        assert!(alias.validate().is_err());
    }

    #[test]
    fn empty_alias_disables_it() {
        let mut config = config();
        config.openapi.scalar_ui_alias = String::new();
        assert!(config.validate().is_ok());
        assert_eq!(config.openapi.paths().len(), 2);
    }
}
