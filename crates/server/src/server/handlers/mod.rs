//! Axum request handlers for all service endpoints.

pub mod auth;
pub mod credentials;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::protocol::{ErrorResponse, HealthResponse};

use super::state::AppState;

/// `GET /health` — liveness and readiness check.
///
/// Returns `200 OK` when credential key material is configured and
/// `503 Service Unavailable` otherwise.
pub async fn health(State(state): State<AppState>) -> Response {
    let encryption_ready = state.credentials.encryption_ready();
    let (status_code, status_str) = if encryption_ready {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    let body = HealthResponse {
        status: status_str.into(),
        encryption_ready,
    };
    (status_code, Json(body)).into_response()
}

/// Catch-all 404 handler.
pub async fn not_found() -> impl IntoResponse {
    let err = ErrorResponse::new("not_found", "Route not found");
    (StatusCode::NOT_FOUND, Json(err))
}
