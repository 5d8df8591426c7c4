//! Single-text prediction handlers

use axum::{extract::State, response::Html, Form, Json};
use serde::Deserialize;
use validator::Validate;

use crate::{AppState, AppResult};
use crate::handlers::page::base_page;
use crate::logic::{predict_one, SinglePrediction};

#[derive(Debug, Deserialize, Validate)]
pub struct PredictRequest {
    /// At most 10 000 characters
    #[validate(length(max = 10000))]
    #[serde(default)]
    pub text: String,
}

fn run(state: &AppState, req: &PredictRequest) -> AppResult<SinglePrediction> {
    req.validate()?;
    Ok(predict_one(&req.text, &state.registry)?)
}

/// JSON: predict one text with every model
pub async fn predict(
    State(state): State<AppState>,
    Json(req): Json<PredictRequest>,
) -> AppResult<Json<SinglePrediction>> {
    Ok(Json(run(&state, &req)?))
}

/// Form post from the main page
pub async fn predict_form(
    State(state): State<AppState>,
    Form(req): Form<PredictRequest>,
) -> AppResult<Html<String>> {
    let mut page = base_page(&state);

    match run(&state, &req) {
        Ok(single) => page.single = Some(single),
        Err(e) => page.single_error = Some(e.user_message()),
    }
    page.text = req.text;

    Ok(Html(page.render(&state.templates)?))
}
