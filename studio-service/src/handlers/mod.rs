//! HTTP handlers for studio-service.

pub mod bookings;
pub mod catalog;
pub mod clients;
pub mod editing;
pub mod invoices;
pub mod settings;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use service_core::error::AppError;

use crate::services::{get_metrics, StudioSnapshot};
use crate::startup::AppState;

/// Liveness probe. Reports unhealthy when the store cannot be reached.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.studio.store.health_check().await {
        Ok(_) => {
            tracing::debug!("Health check passed");
            (
                StatusCode::OK,
                Json(json!({
                    "status": "ok",
                    "service": "studio-service",
                    "version": env!("CARGO_PKG_VERSION")
                })),
            )
        }
        Err(e) => {
            tracing::warn!(error = %e, "Health check failed - store unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unhealthy",
                    "service": "studio-service",
                    "error": e.to_string()
                })),
            )
        }
    }
}

pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.studio.store.health_check().await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

/// Prometheus scrape endpoint.
pub async fn metrics_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        get_metrics(),
    )
}

/// Everything the back-office UI loads on start.
pub async fn bootstrap(State(state): State<AppState>) -> Result<Json<StudioSnapshot>, AppError> {
    let snapshot = state.studio.dashboard.snapshot().await?;
    Ok(Json(snapshot))
}
