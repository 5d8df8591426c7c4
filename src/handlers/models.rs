//! Loaded model listing

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::AppState;
use crate::logic::batch::prediction_column;

#[derive(Debug, Serialize)]
pub struct ModelInfo {
    pub name: String,
    pub kind: &'static str,
    pub classes: Vec<i64>,
    pub n_features: usize,
    pub has_evaluation: bool,
    pub output_column: String,
    pub path: String,
    pub sha256: String,
    pub loaded_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    pub models: Vec<ModelInfo>,
    pub warnings: Vec<String>,
}

/// List loaded models and load warnings
pub async fn list(State(state): State<AppState>) -> Json<ModelsResponse> {
    let models = state
        .registry
        .iter()
        .map(|entry| {
            let bundle = &entry.bundle;
            ModelInfo {
                name: entry.name.clone(),
                kind: bundle.model.kind(),
                classes: bundle.model.classes().to_vec(),
                n_features: bundle.vectorizer.n_features(),
                has_evaluation: bundle.evaluation.is_some(),
                output_column: prediction_column(&entry.name),
                path: bundle.source.path.display().to_string(),
                sha256: bundle.source.sha256.clone(),
                loaded_at: bundle.source.loaded_at,
            }
        })
        .collect();

    Json(ModelsResponse {
        models,
        warnings: state.registry.warnings().to_vec(),
    })
}
