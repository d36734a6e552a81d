use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::analysis::{AnalysisError, ANALYSIS_FAILED};

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized")]
    Unauthorized,

    /// Any analysis failure. The cause is logged, never returned.
    #[error("Analysis error: {0}")]
    Analysis(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

impl From<AnalysisError> for AppError {
    fn from(e: AnalysisError) -> Self {
        AppError::Analysis(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "Authentication required".to_string(),
            ),
            AppError::Analysis(cause) => {
                tracing::error!("Error analyzing assessment: {cause}");
                (StatusCode::INTERNAL_SERVER_ERROR, ANALYSIS_FAILED.to_string())
            }
            AppError::Storage(msg) => {
                tracing::error!("File storage error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A storage error occurred".to_string(),
                )
            }
            AppError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
