//! Liveness check handler.

use aide::axum::ApiRouter;
use aide::transform::TransformOperation;

use crate::service::ServiceState;

/// Tracing target for monitor operations.
const TRACING_TARGET: &str = "audiograb_server::handler::monitors";

/// Plain-text body returned while the process is up.
pub const HEALTH_MESSAGE: &str = "Audio download API is online";

async fn health_status() -> String {
    tracing::trace!(target: TRACING_TARGET, "Health check");
    HEALTH_MESSAGE.to_owned()
}

fn health_status_docs(op: TransformOperation) -> TransformOperation {
    op.summary("Health check")
        .description("Returns a plain-text message while the server is running.")
        .response::<200, String>()
}

/// Returns a [`Router`] with the health route mounted at `path`.
///
/// [`Router`]: axum::routing::Router
pub fn routes(path: &str) -> ApiRouter<ServiceState> {
    use aide::axum::routing::*;

    ApiRouter::new()
        .api_route(path, get_with(health_status, health_status_docs))
        .with_path_items(|item| item.tag("Health"))
}
