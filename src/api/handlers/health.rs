//! Health check handler

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::api::state::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "healthy" or "unhealthy"
    pub status: String,

    /// Cache backend label: "memory" or "redis"
    pub backend: String,

    /// Error message if unhealthy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// GET /health - liveness of the capability cache
///
/// Returns 200 OK if the cache answers its probe, 503 Service Unavailable
/// if not.
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> Result<Json<HealthResponse>, (StatusCode, Json<HealthResponse>)> {
    if state.cache.health_check().await {
        Ok(Json(HealthResponse {
            status: "healthy".to_string(),
            backend: state.backend_label.to_string(),
            error: None,
        }))
    } else {
        Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse {
                status: "unhealthy".to_string(),
                backend: state.backend_label.to_string(),
                error: Some("capability cache probe failed".to_string()),
            }),
        ))
    }
}
