//! Liveness endpoints

use axum::{extract::State, Json};

use crate::error::ApiResult;
use crate::models::HealthResponse;
use crate::state::AppState;

pub async fn root() -> &'static str {
    "Wallet Auth Server"
}

/// GET /health - Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    let active_sessions = state.sessions.active_sessions().await?;

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        active_sessions,
    }))
}
