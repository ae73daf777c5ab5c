//! Interview state machine. Pure: every function takes the current record and
//! returns the next one, persistence is the service's job.
//!
//! ```text
//! scheduled ──begin──▶ in_progress ──complete──▶ completed
//!     │                     │
//!     └──────cancel─────────┴──────────────────▶ cancelled
//! ```
//! `no_show` is set by external scheduling and is terminal here.

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::interview::{Interview, InterviewStatus};
use crate::models::session::SessionStatus;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("cannot {action} interview {id}: status is {}", .from.as_str())]
    Interview {
        id: Uuid,
        action: &'static str,
        from: InterviewStatus,
    },

    #[error("cannot {action} session {id}: status is {}", .from.as_str())]
    Session {
        id: Uuid,
        action: &'static str,
        from: SessionStatus,
    },
}

impl From<TransitionError> for AppError {
    fn from(err: TransitionError) -> Self {
        AppError::InvalidStateTransition(err.to_string())
    }
}

/// What `start` should do for an interview in its current status.
#[derive(Debug, Clone, PartialEq)]
pub enum StartDisposition {
    /// First start: the interview moves to `in_progress`.
    Begin(Interview),
    /// Already running (client reload); nothing to transition.
    Resume,
}

fn refuse(interview: &Interview, action: &'static str) -> TransitionError {
    TransitionError::Interview {
        id: interview.id,
        action,
        from: interview.status,
    }
}

pub fn prepare_start(
    interview: &Interview,
    now: DateTime<Utc>,
) -> Result<StartDisposition, TransitionError> {
    match interview.status {
        InterviewStatus::Scheduled => Ok(StartDisposition::Begin(Interview {
            status: InterviewStatus::InProgress,
            started_at: Some(now),
            updated_at: now,
            ..interview.clone()
        })),
        InterviewStatus::InProgress => Ok(StartDisposition::Resume),
        _ => Err(refuse(interview, "start")),
    }
}

/// Candidate messages are only accepted while the interview runs.
pub fn ensure_accepts_messages(interview: &Interview) -> Result<(), TransitionError> {
    match interview.status {
        InterviewStatus::InProgress => Ok(()),
        _ => Err(refuse(interview, "send a message to")),
    }
}

pub fn complete(interview: &Interview, now: DateTime<Utc>) -> Result<Interview, TransitionError> {
    match interview.status {
        InterviewStatus::InProgress => Ok(Interview {
            status: InterviewStatus::Completed,
            completed_at: Some(now),
            updated_at: now,
            ..interview.clone()
        }),
        _ => Err(refuse(interview, "end")),
    }
}

pub fn cancel(
    interview: &Interview,
    reason: &str,
    cancelled_by: Option<Uuid>,
    now: DateTime<Utc>,
) -> Result<Interview, TransitionError> {
    match interview.status {
        InterviewStatus::Scheduled | InterviewStatus::InProgress => Ok(Interview {
            status: InterviewStatus::Cancelled,
            cancelled_at: Some(now),
            cancelled_by,
            cancellation_reason: Some(reason.to_string()),
            updated_at: now,
            ..interview.clone()
        }),
        _ => Err(refuse(interview, "cancel")),
    }
}
