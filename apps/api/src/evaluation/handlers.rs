use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::errors::AppError;
use crate::evaluation::generator;
use crate::models::evaluation::EvaluationResult;
use crate::state::AppState;

/// GET /api/v1/interviews/:id/result
pub async fn handle_get_result(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<EvaluationResult>, AppError> {
    let result = state
        .store
        .find_result(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No result for interview {id}")))?;
    Ok(Json(result))
}

/// POST /api/v1/interviews/:id/result
///
/// Generates the result if none exists yet; otherwise returns the stored one.
pub async fn handle_generate_result(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<EvaluationResult>, AppError> {
    Ok(Json(generator::generate(&state, id).await?))
}
