use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "speaker", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    Ai,
    Candidate,
}

impl Speaker {
    /// Label used in evaluation transcripts.
    pub fn transcript_label(self) -> &'static str {
        match self {
            Speaker::Ai => "AI Interviewer",
            Speaker::Candidate => "Candidate",
        }
    }
}

/// Immutable, append-only dialogue record. Timestamps are strictly increasing per interview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ConversationTurn {
    pub id: Uuid,
    pub interview_id: Uuid,
    pub speaker: Speaker,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}
