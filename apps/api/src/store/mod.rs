//! Persistence ports. Services depend on these traits, never on `PgPool` directly.
//!
//! `AppState` carries a single `Arc<dyn Store>`; `postgres::PgStore` is the production adapter.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::models::conversation::{ConversationTurn, Speaker};
use crate::models::evaluation::EvaluationResult;
use crate::models::interview::{Interview, InterviewContext, InterviewStatus};
use crate::models::screenshot::{IssueType, Screenshot};
use crate::models::session::{InterviewSession, SessionStatus};

pub mod postgres;

/// Append-only ordered dialogue log per interview.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Appends a turn. The store assigns a timestamp strictly greater than the
    /// interview's latest turn, so replay order equals append order.
    async fn append_turn(
        &self,
        interview_id: Uuid,
        speaker: Speaker,
        message: &str,
    ) -> Result<ConversationTurn>;

    /// All turns of an interview, oldest first.
    async fn list_turns(&self, interview_id: Uuid) -> Result<Vec<ConversationTurn>>;
}

#[async_trait]
pub trait InterviewRepository: Send + Sync {
    async fn find_interview(&self, interview_id: Uuid) -> Result<Option<Interview>>;

    /// Interview plus job, candidate, persona and reference questions.
    async fn load_context(&self, interview_id: Uuid) -> Result<Option<InterviewContext>>;

    /// Persists an already-validated transition, but only if the stored status is
    /// still `expected`. Returns `false` when another writer got there first.
    async fn save_interview_transition(
        &self,
        interview: &Interview,
        expected: InterviewStatus,
    ) -> Result<bool>;

    /// Opens a new attempt with the next sequence number. The first attempt is primary.
    async fn open_session(
        &self,
        interview_id: Uuid,
        device_info: Option<&str>,
    ) -> Result<InterviewSession>;

    async fn find_session(&self, session_id: Uuid) -> Result<Option<InterviewSession>>;

    async fn list_sessions(&self, interview_id: Uuid) -> Result<Vec<InterviewSession>>;

    /// Compare-and-set on session status, same contract as `save_interview_transition`.
    async fn save_session_transition(
        &self,
        session: &InterviewSession,
        expected: SessionStatus,
    ) -> Result<bool>;
}

/// Fields of a freshly analyzed screenshot.
#[derive(Debug, Clone)]
pub struct NewScreenshot {
    pub interview_id: Uuid,
    pub session_id: Option<Uuid>,
    pub sequence_number: i32,
    pub s3_key: String,
    pub face_count: i32,
    pub multiple_people_detected: bool,
    pub issue_type: IssueType,
    pub confidence: f64,
    pub metadata: Value,
}

#[async_trait]
pub trait ProctoringRepository: Send + Sync {
    async fn insert_screenshot(&self, screenshot: NewScreenshot) -> Result<Screenshot>;

    /// Ordered by sequence number, then capture time.
    async fn list_screenshots(&self, interview_id: Uuid) -> Result<Vec<Screenshot>>;
}

/// Outcome of writing a result under the one-result-per-interview constraint.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    Inserted(EvaluationResult),
    /// Another writer stored a result first; this is the stored record.
    Existing(EvaluationResult),
}

#[async_trait]
pub trait ResultRepository: Send + Sync {
    async fn find_result(&self, interview_id: Uuid) -> Result<Option<EvaluationResult>>;

    async fn insert_result(&self, result: &EvaluationResult) -> Result<InsertOutcome>;
}

/// Everything the engine persists.
pub trait Store:
    ConversationStore + InterviewRepository + ProctoringRepository + ResultRepository
{
}

impl<T> Store for T where
    T: ConversationStore + InterviewRepository + ProctoringRepository + ResultRepository
{
}
