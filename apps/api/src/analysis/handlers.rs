use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::Deserialize;
use serde_json::Value;

use crate::errors::AppError;
use crate::models::AnswerSet;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub answers: AnswerSet,
}

/// POST /api/analyze-assessment
///
/// Returns the model's `careerPaths` document as-is. Every failure, including a
/// malformed request body, becomes the same generic 500.
pub async fn handle_analyze_assessment(
    State(state): State<AppState>,
    request: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(request) = request.map_err(|e| AppError::Analysis(format!("bad request body: {e}")))?;
    let analysis = state.analyzer.analyze_value(&request.answers).await?;
    Ok(Json(analysis))
}
