//! System endpoints: liveness and readiness.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::app_state::AppState;

/// Health check response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// `healthy`, `ready` or `unavailable`.
    pub status: String,
    /// RFC 3339 timestamp.
    pub timestamp: String,
    /// Crate version.
    pub version: String,
}

impl HealthResponse {
    fn now(status: &str) -> Self {
        Self {
            status: status.to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// `GET /health`: Service liveness.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Returns service health status, version, and current timestamp.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse::now("healthy")))
}

/// `GET /ready`: Storage reachability.
#[utoipa::path(
    get,
    path = "/ready",
    tag = "System",
    summary = "Readiness check",
    description = "Pings the storage backend. Returns 503 while it is unreachable.",
    responses(
        (status = 200, description = "Storage reachable", body = HealthResponse),
        (status = 503, description = "Storage unreachable", body = HealthResponse),
    )
)]
pub async fn ready_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.donut_service.ping().await {
        Ok(()) => (StatusCode::OK, Json(HealthResponse::now("ready"))),
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse::now("unavailable")),
            )
        }
    }
}

/// System routes mounted at the root level (not under /api/v1).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
}
