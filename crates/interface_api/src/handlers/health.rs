//! Health check handlers

use axum::{extract::State, Json};
use serde::Serialize;

use core_kernel::AdapterHealth;

use crate::{error::ApiError, AppState};

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub contracts: Vec<String>,
}

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        contracts: Vec::new(),
    })
}

/// Readiness check (includes the ledger)
pub async fn readiness_check(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, ApiError> {
    let health = state.ledger.health_check().await;
    if health.status == AdapterHealth::Unhealthy {
        return Err(ApiError::Unavailable(
            health
                .message
                .unwrap_or_else(|| health.adapter_id.clone()),
        ));
    }

    let mut contracts: Vec<String> = state.contracts.keys().cloned().collect();
    contracts.sort();
    Ok(Json(HealthResponse {
        status: "ready".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        contracts,
    }))
}
