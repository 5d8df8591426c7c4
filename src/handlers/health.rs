//! Health check handler

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    models_loaded: usize,
    timestamp: i64,
}

pub async fn check(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = if state.registry.is_empty() { "degraded" } else { "healthy" };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        models_loaded: state.registry.len(),
        timestamp: chrono::Utc::now().timestamp(),
    })
}
