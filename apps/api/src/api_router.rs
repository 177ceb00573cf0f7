use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::openapi;
use crate::state::AppState;

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::status::root_handler))
        .route("/health", get(handlers::status::health_handler))
        .merge(openapi::docs_router())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
