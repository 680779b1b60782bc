//! Liveness endpoint.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::Json;
use serde::{Deserialize, Serialize};

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    /// RFC 3339, UTC.
    pub timestamp: String,
}

/// Paths answered by the health check instead of object storage.
pub fn is_health_path(path: &str) -> bool {
    path.is_empty() || path == "health"
}

/// `/` and `/health`: always 200, regardless of access configuration.
pub fn health_check(state: &AppState) -> ApiResult<Json<HealthResponse>> {
    let timestamp = state
        .clock
        .rfc3339_now()
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        service: state.config.server.service_name.clone(),
        timestamp,
    }))
}
