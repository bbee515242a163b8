pub mod core;
pub mod error_handler;
pub mod middleware_layer;
pub mod routes;

use std::sync::Arc;

use axum::{Router, middleware, routing::post};

use crate::core::app_state::AppState;
use crate::middleware_layer::json_extractor::json_error_mapper;
use crate::routes::webhooks::webhook_route::webhook_route;

/// Builds the thin transport-neutral adapter: one route, one error-mapping
/// middleware layer, matching spec §6's "transport layer stays intentionally
/// minimal" note.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/webhooks/change-request", post(webhook_route))
        .layer(middleware::from_fn(json_error_mapper))
        .with_state(state)
}
