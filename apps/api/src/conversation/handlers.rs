use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::conversation::engine::{self, EndReply, TurnReply};
use crate::errors::AppError;
use crate::lifecycle::service::load_interview;
use crate::models::conversation::ConversationTurn;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewRequest {
    pub interview_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRequest {
    pub interview_id: Uuid,
    pub message: Option<String>,
}

/// POST /api/v1/conversation/start
pub async fn handle_start(
    State(state): State<AppState>,
    Json(req): Json<InterviewRequest>,
) -> Result<Json<TurnReply>, AppError> {
    Ok(Json(engine::start(&state, req.interview_id).await?))
}

/// POST /api/v1/conversation/message
pub async fn handle_message(
    State(state): State<AppState>,
    Json(req): Json<MessageRequest>,
) -> Result<Json<TurnReply>, AppError> {
    let message = req
        .message
        .ok_or_else(|| AppError::Validation("message is required".to_string()))?;
    Ok(Json(
        engine::send_message(&state, req.interview_id, &message).await?,
    ))
}

/// POST /api/v1/conversation/end
pub async fn handle_end(
    State(state): State<AppState>,
    Json(req): Json<InterviewRequest>,
) -> Result<Json<EndReply>, AppError> {
    Ok(Json(engine::end_interview(&state, req.interview_id).await?))
}

/// GET /api/v1/interviews/:id/transcript
pub async fn handle_transcript(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ConversationTurn>>, AppError> {
    load_interview(&state, id).await?;
    Ok(Json(state.store.list_turns(id).await?))
}
