//! Applies the pure state machines against the store.
//!
//! Every write is a compare-and-set on the status that was read, so two requests
//! racing on the same record cannot both succeed.

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::lifecycle::interview::{self, TransitionError};
use crate::lifecycle::session::{self, SessionMetrics};
use crate::models::interview::{Interview, InterviewStatus};
use crate::models::session::InterviewSession;
use crate::notifications::{dispatch, InterviewEvent};
use crate::state::AppState;

pub async fn load_interview(state: &AppState, interview_id: Uuid) -> Result<Interview, AppError> {
    state
        .store
        .find_interview(interview_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Interview {interview_id} not found")))
}

async fn load_session(state: &AppState, session_id: Uuid) -> Result<InterviewSession, AppError> {
    state
        .store
        .find_session(session_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Session {session_id} not found")))
}

/// Writes `next` if the stored status still equals `current.status`.
pub async fn persist_interview(
    state: &AppState,
    current: &Interview,
    next: Interview,
) -> Result<Interview, AppError> {
    if !state
        .store
        .save_interview_transition(&next, current.status)
        .await?
    {
        return Err(AppError::InvalidStateTransition(format!(
            "Interview {} changed status concurrently",
            current.id
        )));
    }
    info!(
        "Interview {} {} → {}",
        next.id,
        current.status.as_str(),
        next.status.as_str()
    );
    Ok(next)
}

async fn persist_session(
    state: &AppState,
    current: &InterviewSession,
    next: InterviewSession,
) -> Result<InterviewSession, AppError> {
    if !state
        .store
        .save_session_transition(&next, current.status)
        .await?
    {
        return Err(AppError::InvalidStateTransition(format!(
            "Session {} changed status concurrently",
            current.id
        )));
    }
    if current.status != next.status {
        info!(
            "Session {} (#{}) {} → {}",
            next.id,
            next.session_number,
            current.status.as_str(),
            next.status.as_str()
        );
    }
    Ok(next)
}

// ────────────────────────────────────────────────────────────────────────────
// Interview transitions
// ────────────────────────────────────────────────────────────────────────────

/// `scheduled → in_progress`. Called by the conversation engine once the greeting exists.
pub async fn begin_interview(state: &AppState, current: &Interview) -> Result<Interview, AppError> {
    match interview::prepare_start(current, Utc::now())? {
        interview::StartDisposition::Begin(next) => {
            let started = persist_interview(state, current, next).await?;
            dispatch(
                state.notifier.clone(),
                InterviewEvent::InterviewStarted {
                    interview_id: started.id,
                },
            );
            Ok(started)
        }
        interview::StartDisposition::Resume => Ok(current.clone()),
    }
}

/// `in_progress → completed`. Evaluation is the caller's next step.
pub async fn complete_interview(
    state: &AppState,
    interview_id: Uuid,
) -> Result<Interview, AppError> {
    let current = load_interview(state, interview_id).await?;
    let next = interview::complete(&current, Utc::now())?;
    let completed = persist_interview(state, &current, next).await?;
    dispatch(
        state.notifier.clone(),
        InterviewEvent::InterviewCompleted { interview_id },
    );
    Ok(completed)
}

/// Terminal. Never triggers evaluation.
pub async fn cancel_interview(
    state: &AppState,
    interview_id: Uuid,
    reason: &str,
    cancelled_by: Option<Uuid>,
) -> Result<Interview, AppError> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(AppError::Validation(
            "A cancellation reason is required".to_string(),
        ));
    }

    let current = load_interview(state, interview_id).await?;
    let next = interview::cancel(&current, reason, cancelled_by, Utc::now())?;
    let cancelled = persist_interview(state, &current, next).await?;
    dispatch(
        state.notifier.clone(),
        InterviewEvent::InterviewCancelled {
            interview_id,
            reason: reason.to_string(),
        },
    );
    Ok(cancelled)
}

// ────────────────────────────────────────────────────────────────────────────
// Session operations
// ────────────────────────────────────────────────────────────────────────────

/// Opens a new attempt. Only interviews that can still run accept one.
pub async fn open_session(
    state: &AppState,
    interview_id: Uuid,
    device_info: Option<&str>,
) -> Result<InterviewSession, AppError> {
    let interview = load_interview(state, interview_id).await?;
    if !matches!(
        interview.status,
        InterviewStatus::Scheduled | InterviewStatus::InProgress
    ) {
        return Err(TransitionError::Interview {
            id: interview_id,
            action: "open a session for",
            from: interview.status,
        }
        .into());
    }
    Ok(state.store.open_session(interview_id, device_info).await?)
}

pub async fn list_sessions(
    state: &AppState,
    interview_id: Uuid,
) -> Result<Vec<InterviewSession>, AppError> {
    load_interview(state, interview_id).await?;
    Ok(state.store.list_sessions(interview_id).await?)
}

pub async fn start_session(state: &AppState, session_id: Uuid) -> Result<InterviewSession, AppError> {
    let current = load_session(state, session_id).await?;
    let next = session::start(&current, Utc::now())?;
    persist_session(state, &current, next).await
}

pub async fn pause_session(state: &AppState, session_id: Uuid) -> Result<InterviewSession, AppError> {
    let current = load_session(state, session_id).await?;
    let next = session::pause(&current, Utc::now())?;
    persist_session(state, &current, next).await
}

pub async fn heartbeat_session(
    state: &AppState,
    session_id: Uuid,
    metrics: &SessionMetrics,
) -> Result<InterviewSession, AppError> {
    metrics.validate().map_err(AppError::Validation)?;
    let current = load_session(state, session_id).await?;
    let next = session::heartbeat(&current, metrics, Utc::now())?;
    persist_session(state, &current, next).await
}

pub async fn end_session(state: &AppState, session_id: Uuid) -> Result<InterviewSession, AppError> {
    let current = load_session(state, session_id).await?;
    let next = session::end(&current, Utc::now())?;
    persist_session(state, &current, next).await
}
