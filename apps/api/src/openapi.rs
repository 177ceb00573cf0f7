use axum::Router;
use utoipa::OpenApi;
use utoipa_redoc::{Redoc, Servable};
use utoipa_swagger_ui::SwaggerUi;

use crate::dto::{HealthResponse, StatusResponse};
use crate::handlers;

/// OpenAPI document for the status endpoints.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Healthcare Agent API",
        description = "Healthcare automation MVP with intelligent workflows and audit capabilities"
    ),
    paths(
        handlers::status::root_handler,
        handlers::status::health_handler,
    ),
    components(schemas(StatusResponse, HealthResponse)),
    tags((name = "status", description = "Service status and liveness")),
)]
pub struct ApiDoc;

/// Where the generated OpenAPI JSON is served.
pub const OPENAPI_JSON_PATH: &str = "/api-docs/openapi.json";

/// Swagger UI on `/docs` and ReDoc on `/redoc`.
pub fn docs_router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .merge(SwaggerUi::new("/docs").url(OPENAPI_JSON_PATH, ApiDoc::openapi()))
        .merge(Redoc::with_url("/redoc", ApiDoc::openapi()))
}
