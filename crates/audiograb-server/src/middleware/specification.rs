//! OpenAPI specification middleware with Scalar UI integration.
//!
//! Generates the OpenAPI document from aide's [`ApiRouter`] and serves it
//! as JSON together with the Scalar API reference.
//!
//! ```rust
//! use aide::axum::ApiRouter;
//! use axum::Router;
//! use audiograb_server::middleware::{OpenApiConfig, RouterOpenApiExt};
//!
//! let app: Router<()> = ApiRouter::new()
//!     .with_open_api(OpenApiConfig::default());
//! ```
//!
//! [`ApiRouter`]: aide::axum::ApiRouter

use aide::axum::ApiRouter;
use aide::openapi::{Info, License, OpenApi};
use aide::scalar::Scalar;
use axum::routing::{Router, get};
use axum::{Extension, Json};
#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

/// OpenAPI configuration for aide integration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[must_use = "config does nothing unless you use it"]
pub struct OpenApiConfig {
    /// Path which exposes the OpenAPI JSON specification.
    #[cfg_attr(
        feature = "config",
        arg(long = "openapi-json-path", env = "OPENAPI_JSON_PATH", default_value = "/api-docs/openapi.json")
    )]
    pub open_api_json: String,

    /// Path which exposes the Scalar API reference UI.
    #[cfg_attr(
        feature = "config",
        arg(long = "openapi-scalar-path", env = "OPENAPI_SCALAR_PATH", default_value = "/api-docs")
    )]
    pub scalar_ui: String,

    /// Additional path serving the same Scalar UI. Empty disables it.
    #[cfg_attr(
        feature = "config",
        arg(long = "openapi-scalar-alias", env = "OPENAPI_SCALAR_ALIAS", default_value = "/docs")
    )]
    #[serde(default)]
    pub scalar_ui_alias: String,
}

impl Default for OpenApiConfig {
    fn default() -> Self {
        Self {
            open_api_json: "/api-docs/openapi.json".to_owned(),
            scalar_ui: "/api-docs".to_owned(),
            scalar_ui_alias: "/docs".to_owned(),
        }
    }
}

impl OpenApiConfig {
    /// Returns the Scalar UI alias, if one is configured and distinct.
    pub fn scalar_alias(&self) -> Option<&str> {
        let alias = self.scalar_ui_alias.as_str();
        (!alias.is_empty() && alias != self.scalar_ui).then_some(alias)
    }

    /// Returns every path served by the documentation routes.
    pub fn paths(&self) -> Vec<&str> {
        let mut paths = vec![self.open_api_json.as_str(), self.scalar_ui.as_str()];
        paths.extend(self.scalar_alias());
        paths
    }
}

/// Extension trait for [`ApiRouter`] to add OpenAPI documentation with Scalar UI.
///
/// [`ApiRouter`]: aide::axum::ApiRouter
pub trait RouterOpenApiExt<S> {
    /// Adds OpenAPI documentation routes with default API info.
    fn with_open_api(self, config: OpenApiConfig) -> Router<S>;

    /// Adds OpenAPI documentation routes with custom OpenAPI info.
    fn with_open_api_info(self, config: OpenApiConfig, info: Info) -> Router<S>;
}

impl<S> RouterOpenApiExt<S> for ApiRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_open_api(self, config: OpenApiConfig) -> Router<S> {
        let info = Info {
            title: "Audiograb API".to_owned(),
            summary: Some("Extracts audio from video URLs".to_owned()),
            description: Some(
                "Submit a video URL and receive its audio track as an MP3 attachment. \
                Extraction runs yt-dlp on the server; nothing is kept after the \
                response is sent."
                    .to_owned(),
            ),
            license: Some(License {
                name: "MIT".to_owned(),
                identifier: Some("MIT".to_owned()),
                ..License::default()
            }),
            version: env!("CARGO_PKG_VERSION").to_owned(),
            ..Info::default()
        };

        self.with_open_api_info(config, info)
    }

    fn with_open_api_info(self, config: OpenApiConfig, info: Info) -> Router<S> {
        async fn serve_openapi(Extension(api): Extension<OpenApi>) -> Json<OpenApi> {
            Json(api)
        }

        let mut api = OpenApi {
            info,
            ..OpenApi::default()
        };

        let scalar = Scalar::new(&config.open_api_json);
        let mut router = self
            .route(&config.scalar_ui, scalar.axum_route())
            .route(&config.open_api_json, get(serve_openapi));

        if let Some(alias) = config.scalar_alias() {
            router = router.route(alias, Scalar::new(&config.open_api_json).axum_route());
        }

        router.finish_api(&mut api).layer(Extension(api))
    }
}
