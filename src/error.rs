//! Error handling

use axum::{
    response::{IntoResponse, Response},
    http::StatusCode,
    Json,
};
use serde_json::json;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Request errors
    #[error("{0}")]
    Validation(String),

    #[error("The file must contain a column named `{0}`.")]
    MissingColumn(String),

    #[error("Could not read CSV: {0}")]
    Csv(String),

    // Resource errors
    #[error("{0}")]
    NotFound(String),

    // Model errors
    #[error("Prediction failed: {0}")]
    Prediction(#[from] ModelError),

    // Generic errors
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::MissingColumn(_) | AppError::Csv(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Prediction(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to the user
    pub fn user_message(&self) -> String {
        match self {
            AppError::Prediction(err) => {
                tracing::error!("Prediction error: {}", err);
                "Prediction failed for one of the models".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({
            "error": self.user_message(),
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

impl From<csv::Error> for AppError {
    fn from(err: csv::Error) -> Self {
        AppError::Csv(err.to_string())
    }
}

impl From<minijinja::Error> for AppError {
    fn from(err: minijinja::Error) -> Self {
        AppError::Internal(format!("rendering page: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}

/// Failures while loading a bundle or running one of its models
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("cannot read bundle: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed bundle: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid bundle: {0}")]
    Invalid(String),

    #[error("invalid token pattern: {0}")]
    TokenPattern(#[from] regex::Error),

    #[error("feature dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}
