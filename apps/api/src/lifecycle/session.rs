//! Attempt (session) state machine.
//!
//! ```text
//! waiting ──start──▶ active ──end──▶ completed
//!                    │    ▲
//!               pause│    │start
//!                    ▼    │
//!                    paused
//! ```
//! `abandoned` is applied by an external timeout policy.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::lifecycle::interview::TransitionError;
use crate::models::session::{InterviewSession, SessionStatus};

fn refuse(session: &InterviewSession, action: &'static str) -> TransitionError {
    TransitionError::Session {
        id: session.id,
        action,
        from: session.status,
    }
}

/// Optional quality metrics reported by the client during a session.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMetrics {
    pub questions_answered: Option<i32>,
    pub completion_percentage: Option<i32>,
    pub audio_quality: Option<i32>,
    pub video_quality: Option<i32>,
    pub session_quality_score: Option<i32>,
}

impl SessionMetrics {
    pub fn validate(&self) -> Result<(), String> {
        fn check(name: &str, value: Option<i32>, min: i32, max: i32) -> Result<(), String> {
            match value {
                Some(v) if !(min..=max).contains(&v) => {
                    Err(format!("{name} must be between {min} and {max}, got {v}"))
                }
                _ => Ok(()),
            }
        }
        check("questionsAnswered", self.questions_answered, 0, i32::MAX)?;
        check("completionPercentage", self.completion_percentage, 0, 100)?;
        check("audioQuality", self.audio_quality, 1, 10)?;
        check("videoQuality", self.video_quality, 1, 10)?;
        check("sessionQualityScore", self.session_quality_score, 1, 10)
    }
}

/// `waiting|paused → active`. Resuming from pause keeps the original start time.
pub fn start(
    session: &InterviewSession,
    now: DateTime<Utc>,
) -> Result<InterviewSession, TransitionError> {
    match session.status {
        SessionStatus::Waiting | SessionStatus::Paused => Ok(InterviewSession {
            status: SessionStatus::Active,
            started_at: session.started_at.or(Some(now)),
            last_activity_at: Some(now),
            updated_at: now,
            ..session.clone()
        }),
        _ => Err(refuse(session, "start")),
    }
}

/// `active → paused`, counted as a network interruption.
pub fn pause(
    session: &InterviewSession,
    now: DateTime<Utc>,
) -> Result<InterviewSession, TransitionError> {
    match session.status {
        SessionStatus::Active => Ok(InterviewSession {
            status: SessionStatus::Paused,
            network_interruptions: session.network_interruptions + 1,
            last_activity_at: Some(now),
            updated_at: now,
            ..session.clone()
        }),
        _ => Err(refuse(session, "pause")),
    }
}

/// Liveness ping with optional metrics. Status is unchanged; terminal sessions refuse.
pub fn heartbeat(
    session: &InterviewSession,
    metrics: &SessionMetrics,
    now: DateTime<Utc>,
) -> Result<InterviewSession, TransitionError> {
    if session.status.is_terminal() {
        return Err(refuse(session, "record a heartbeat for"));
    }
    Ok(InterviewSession {
        last_activity_at: Some(now),
        questions_answered: metrics
            .questions_answered
            .unwrap_or(session.questions_answered),
        completion_percentage: metrics
            .completion_percentage
            .unwrap_or(session.completion_percentage),
        audio_quality: metrics.audio_quality.or(session.audio_quality),
        video_quality: metrics.video_quality.or(session.video_quality),
        session_quality_score: metrics
            .session_quality_score
            .or(session.session_quality_score),
        updated_at: now,
        ..session.clone()
    })
}

/// `active → completed`; duration is whole minutes, rounded down.
pub fn end(
    session: &InterviewSession,
    now: DateTime<Utc>,
) -> Result<InterviewSession, TransitionError> {
    match session.status {
        SessionStatus::Active => {
            let started = session.started_at.unwrap_or(now);
            let minutes = (now - started).num_minutes().max(0) as i32;
            Ok(InterviewSession {
                status: SessionStatus::Completed,
                ended_at: Some(now),
                actual_duration_minutes: Some(minutes),
                last_activity_at: Some(now),
                updated_at: now,
                ..session.clone()
            })
        }
        _ => Err(refuse(session, "end")),
    }
}
