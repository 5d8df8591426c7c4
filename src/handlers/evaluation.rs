//! Evaluation handler

use axum::{extract::State, Json};

use crate::AppState;
use crate::logic::{render_evaluation, ModelEvaluation};

/// Report table and confusion matrix for every loaded model
pub async fn list(State(state): State<AppState>) -> Json<Vec<ModelEvaluation>> {
    Json(render_evaluation(&state.registry))
}
