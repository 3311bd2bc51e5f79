use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::app::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub services: ServiceHealth,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceHealth {
    pub ai_service: String,
}

/// Health check endpoint - public
///
/// The inference endpoint has no health route of its own, so only its
/// configuration is reported. A missing endpoint degrades the service but
/// booking checks still work.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let configured = state.inference.is_configured();

    Json(HealthResponse {
        status: if configured { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        services: ServiceHealth {
            ai_service: if configured { "configured" } else { "not_configured" }.to_string(),
        },
    })
}
