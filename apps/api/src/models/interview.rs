use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Lifecycle of a scheduled interview. Only the lifecycle module mutates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "interview_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum InterviewStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
    NoShow,
}

impl InterviewStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            InterviewStatus::Scheduled => "scheduled",
            InterviewStatus::InProgress => "in_progress",
            InterviewStatus::Completed => "completed",
            InterviewStatus::Cancelled => "cancelled",
            InterviewStatus::NoShow => "no_show",
        }
    }
}

/// Voice interviews get much stricter verbosity rules in the system prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "interview_modality", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum InterviewModality {
    Voice,
    Text,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Interview {
    pub id: Uuid,
    pub job_id: Uuid,
    pub candidate_id: Uuid,
    pub agent_id: Option<Uuid>,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub status: InterviewStatus,
    pub modality: InterviewModality,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancelled_by: Option<Uuid>,
    pub cancellation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct JobFacts {
    pub title: String,
    pub experience_level: String,
    pub skills_required: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct CandidateFacts {
    pub id: Uuid,
    pub full_name: String,
    pub experience_years: Option<f64>,
    pub current_company: Option<String>,
    pub resume_summary: Option<String>,
    pub resume_s3_key: Option<String>,
}

impl CandidateFacts {
    pub fn first_name(&self) -> &str {
        self.full_name.split_whitespace().next().unwrap_or("there")
    }
}

/// The interviewer persona ("agent") configured for an interview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct AgentPersona {
    pub id: Uuid,
    pub name: String,
    pub system_prompt: String,
    pub interview_type: String,
}

/// Everything the conversation engine needs to rebuild its prompt for one request.
#[derive(Debug, Clone)]
pub struct InterviewContext {
    pub interview: Interview,
    pub job: JobFacts,
    pub candidate: CandidateFacts,
    pub agent: Option<AgentPersona>,
    /// Job-specific custom questions, insertion order.
    pub job_questions: Vec<String>,
    /// Persona default questions, insertion order.
    pub agent_questions: Vec<String>,
}
