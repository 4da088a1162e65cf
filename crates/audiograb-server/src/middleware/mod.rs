//! Middleware for `axum::Router` and HTTP request processing.
//!
//! - Recovery (panics, timeouts, service errors)
//! - Observability (tracing spans, request IDs)
//! - Security (CORS, headers, body limits, compression)
//! - OpenAPI documentation
//!
//! ```rust,no_run
//! use axum::Router;
//! use audiograb_server::middleware::{
//!     RouterObservabilityExt, RouterRecoveryExt, RouterSecurityExt,
//! };
//!
//! let app: Router = Router::new()
//!     .with_default_security()
//!     .with_observability()
//!     .with_default_recovery();
//! ```

mod observability;
mod recovery;
mod security;
mod specification;

pub use observability::RouterObservabilityExt;
pub use recovery::{RecoveryConfig, RouterRecoveryExt};
pub use security::{
    CorsConfig, FrameOptions, ReferrerPolicy, RouterSecurityExt, SecurityHeadersConfig,
};
pub use specification::{OpenApiConfig, RouterOpenApiExt};
