//! Health check endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Serialize;

use super::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub event_store: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audit_records: Option<u64>,
}

/// GET /health — `200` while the event store answers, `503` otherwise.
pub async fn check(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    match state.event_store.count().await {
        Ok(count) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok",
                event_store: "ok",
                audit_records: Some(count),
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: event store unreachable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "degraded",
                    event_store: "unavailable",
                    audit_records: None,
                }),
            )
        }
    }
}
