//! Batch CSV prediction and result downloads

use axum::{
    body::Bytes,
    extract::{Multipart, Path, State},
    http::header,
    response::{Html, IntoResponse, Response},
};
use uuid::Uuid;

use crate::{AppState, AppResult, AppError};
use crate::handlers::page::base_page;
use crate::logic::batch::{CSV_CONTENT_TYPE, DOWNLOAD_FILE_NAME};
use crate::logic::{predict_batch, BatchOutcome};

/// Run the batch off the async executor; a large upload is CPU bound
async fn run_batch(state: &AppState, bytes: Bytes) -> AppResult<BatchOutcome> {
    let registry = state.registry.clone();
    tokio::task::spawn_blocking(move || predict_batch(&bytes, &registry))
        .await
        .map_err(|e| AppError::Internal(format!("batch task failed: {}", e)))?
}

fn csv_attachment(bytes: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, CSV_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", DOWNLOAD_FILE_NAME),
            ),
        ],
        bytes,
    )
        .into_response()
}

/// Pull the `file` field out of the upload form
async fn read_upload(mut multipart: Multipart) -> AppResult<Option<Bytes>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(e.body_text()))?
    {
        if field.name() == Some("file") {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(e.body_text()))?;
            return Ok(Some(bytes).filter(|b| !b.is_empty()));
        }
    }
    Ok(None)
}

/// Upload form from the main page
pub async fn upload(State(state): State<AppState>, multipart: Multipart) -> AppResult<Html<String>> {
    let mut page = base_page(&state);

    let outcome = match read_upload(multipart).await {
        Ok(Some(bytes)) => run_batch(&state, bytes).await,
        Ok(None) => Err(AppError::Validation("Please choose a CSV file to upload.".to_string())),
        Err(e) => Err(e),
    };

    match outcome.and_then(|outcome| Ok((outcome.table.to_csv()?, outcome))) {
        Ok((csv, outcome)) => {
            page.download_id = Some(state.downloads.insert(csv));
            page.batch = Some(outcome);
        }
        Err(e) => page.batch_error = Some(e.user_message()),
    }

    Ok(Html(page.render(&state.templates)?))
}

/// JSON API: raw CSV in, augmented CSV attachment out
pub async fn predict_csv(State(state): State<AppState>, body: Bytes) -> AppResult<Response> {
    let outcome = run_batch(&state, body).await?;
    Ok(csv_attachment(outcome.table.to_csv()?))
}

/// Download a stored batch result
pub async fn download(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    let stored = state
        .downloads
        .get(id)
        .ok_or_else(|| AppError::NotFound("Download not found or expired".to_string()))?;

    Ok(csv_attachment(stored.bytes.as_ref().clone()))
}
