//! Main page

use axum::{extract::State, response::Html};

use crate::{AppState, AppResult};
use crate::logic::render_evaluation;
use crate::views::Page;

/// Page with load warnings and the evaluation panel filled in
pub fn base_page(state: &AppState) -> Page {
    Page::new(&state.registry, render_evaluation(&state.registry))
}

pub async fn index(State(state): State<AppState>) -> AppResult<Html<String>> {
    Ok(Html(base_page(&state).render(&state.templates)?))
}
