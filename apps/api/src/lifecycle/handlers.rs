use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::lifecycle::service;
use crate::lifecycle::session::SessionMetrics;
use crate::models::interview::Interview;
use crate::models::session::InterviewSession;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelRequest {
    pub reason: String,
    pub cancelled_by: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenSessionRequest {
    pub device_info: Option<String>,
}

/// POST /api/v1/interviews/:id/cancel
pub async fn handle_cancel_interview(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<CancelRequest>,
) -> Result<Json<Interview>, AppError> {
    let interview = service::cancel_interview(&state, id, &req.reason, req.cancelled_by).await?;
    Ok(Json(interview))
}

/// POST /api/v1/interviews/:id/sessions
pub async fn handle_open_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<OpenSessionRequest>,
) -> Result<(StatusCode, Json<InterviewSession>), AppError> {
    let session = service::open_session(&state, id, req.device_info.as_deref()).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// GET /api/v1/interviews/:id/sessions
pub async fn handle_list_sessions(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<InterviewSession>>, AppError> {
    Ok(Json(service::list_sessions(&state, id).await?))
}

/// POST /api/v1/sessions/:id/start
pub async fn handle_start_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<InterviewSession>, AppError> {
    Ok(Json(service::start_session(&state, id).await?))
}

/// POST /api/v1/sessions/:id/pause
pub async fn handle_pause_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<InterviewSession>, AppError> {
    Ok(Json(service::pause_session(&state, id).await?))
}

/// POST /api/v1/sessions/:id/heartbeat
pub async fn handle_session_heartbeat(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(metrics): Json<SessionMetrics>,
) -> Result<Json<InterviewSession>, AppError> {
    Ok(Json(service::heartbeat_session(&state, id, &metrics).await?))
}

/// POST /api/v1/sessions/:id/end
pub async fn handle_end_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<InterviewSession>, AppError> {
    Ok(Json(service::end_session(&state, id).await?))
}
