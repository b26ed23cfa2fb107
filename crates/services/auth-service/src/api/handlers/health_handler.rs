//! Health check handlers.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use uuid::Uuid;

use crate::api::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub revocation_store: StoreHealth,
}

/// Revocation backend status with optional error message.
#[derive(Debug, Serialize)]
pub struct StoreHealth {
    pub backend: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Create health routes.
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/", get(health_check))
}

/// Health check endpoint - pings the revocation store.
pub async fn health_check(State(state): State<AppState>) -> Response {
    let (status, error) = match state.revocations.is_revoked(Uuid::nil()).await {
        Ok(_) => ("healthy", None),
        Err(e) => ("unhealthy", Some(e.to_string())),
    };
    let healthy = error.is_none();

    let response = HealthResponse {
        status: if healthy { "healthy" } else { "degraded" }.to_string(),
        revocation_store: StoreHealth {
            backend: state.revocations.name().to_string(),
            status: status.to_string(),
            error,
        },
    };

    if healthy {
        (StatusCode::OK, Json(response)).into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response)).into_response()
    }
}
