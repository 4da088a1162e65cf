//! All `axum::`[`Router`]s with related `axum::`[`Handler`]s.
//!
//! ```rust,no_run
//! use audiograb_server::handler::{RouteConfig, routes};
//! use audiograb_server::middleware::{OpenApiConfig, RouterOpenApiExt};
//! use audiograb_server::service::{ServiceConfig, ServiceState};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let state = ServiceState::from_config(&ServiceConfig::default()).await?;
//! let router: axum::Router = routes(&RouteConfig::default())
//!     .with_state(state)
//!     .with_open_api(OpenApiConfig::default());
//! # Ok(())
//! # }
//! ```
//!
//! [`Router`]: axum::routing::Router
//! [`Handler`]: axum::handler::Handler

mod download;
mod error;
mod monitors;
pub mod request;
pub mod response;

use aide::axum::ApiRouter;
use axum::response::{IntoResponse, Response};
#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

pub use crate::handler::error::{Error, ErrorKind, Result};
pub use crate::handler::monitors::HEALTH_MESSAGE;
use crate::service::ServiceState;

/// Paths the API routes are mounted at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[must_use = "config does nothing unless you use it"]
pub struct RouteConfig {
    /// Path of the audio download endpoint.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "DOWNLOAD_PATH", default_value = "/api/baixar")
    )]
    pub download_path: String,

    /// Path of the plain-text health endpoint.
    #[cfg_attr(feature = "config", arg(long, env = "HEALTH_PATH", default_value = "/"))]
    pub health_path: String,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            download_path: "/api/baixar".to_owned(),
            health_path: "/".to_owned(),
        }
    }
}

impl RouteConfig {
    /// Returns all configured paths.
    pub fn paths(&self) -> [&str; 2] {
        [&self.download_path, &self.health_path]
    }

    /// Checks that every path is absolute and that no two paths collide.
    pub fn validate(&self) -> std::result::Result<(), String> {
        for path in self.paths() {
            if !path.starts_with('/') {
                return Err(format!("Route path '{}' must start with '/'", path));
            }
        }

        if self.download_path == self.health_path {
            return Err(format!(
                "Download and health routes cannot share the path '{}'",
                self.download_path
            ));
        }

        Ok(())
    }
}

#[inline]
async fn handler() -> Response {
    ErrorKind::NotFound.into_response()
}

/// Returns an [`ApiRouter`] with all routes and a JSON `404` fallback.
pub fn routes(config: &RouteConfig) -> ApiRouter<ServiceState> {
    ApiRouter::new()
        .merge(download::routes(&config.download_path))
        .merge(monitors::routes(&config.health_path))
        .fallback(handler)
}
