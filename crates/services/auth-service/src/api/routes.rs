//! Route configuration.

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use domain::AUTH_API_PREFIX;

use crate::api::handlers::{auth_routes, health_routes};
use crate::api::openapi::ApiDoc;
use crate::api::AppState;

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check (no auth)
        .nest("/health", health_routes())
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Auth routes; only /me requires a bearer token
        .nest(AUTH_API_PREFIX, auth_routes(state.clone()))
        .with_state(state)
}
