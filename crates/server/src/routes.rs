//! Route configuration.

use crate::handlers;
use crate::metrics::{metrics_handler, register_metrics};
use crate::state::AppState;
use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

/// Create the application router.
///
/// Object paths are arbitrary keys, so everything except `/metrics` goes
/// through the fallback handler.
pub fn create_router(state: AppState) -> Router {
    let mut router = Router::new();

    // When enabled, this endpoint must be network-restricted to the scraper.
    if state.config.server.metrics_enabled {
        register_metrics();
        router = router.route(
            "/metrics",
            get(metrics_handler).fallback(handlers::proxy_request),
        );
    }

    router
        .fallback(handlers::proxy_request)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
