//! PostgreSQL adapter for every persistence port.
//!
//! Conversation turns and results are append-only: turns are never UPDATEd and a
//! result row is written once per interview (unique index on `interview_id`).

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::conversation::{ConversationTurn, Speaker};
use crate::models::evaluation::EvaluationResult;
use crate::models::interview::{
    AgentPersona, CandidateFacts, Interview, InterviewContext, InterviewStatus, JobFacts,
};
use crate::models::screenshot::Screenshot;
use crate::models::session::{InterviewSession, SessionStatus};
use crate::store::{
    ConversationStore, InsertOutcome, InterviewRepository, NewScreenshot, ProctoringRepository,
    ResultRepository,
};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConversationStore for PgStore {
    async fn append_turn(
        &self,
        interview_id: Uuid,
        speaker: Speaker,
        message: &str,
    ) -> Result<ConversationTurn> {
        // GREATEST ignores the NULL of an empty log, so the first turn gets clock time.
        let turn = sqlx::query_as::<_, ConversationTurn>(
            r#"
            INSERT INTO conversation_turns (id, interview_id, speaker, message, timestamp)
            VALUES (
                $1, $2, $3, $4,
                GREATEST(
                    clock_timestamp(),
                    (SELECT MAX(timestamp) FROM conversation_turns WHERE interview_id = $2)
                        + INTERVAL '1 microsecond'
                )
            )
            RETURNING id, interview_id, speaker, message, timestamp
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(interview_id)
        .bind(speaker)
        .bind(message)
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("Failed to append {speaker:?} turn for interview {interview_id}"))?;

        debug!("Appended {:?} turn {} to interview {interview_id}", speaker, turn.id);
        Ok(turn)
    }

    async fn list_turns(&self, interview_id: Uuid) -> Result<Vec<ConversationTurn>> {
        Ok(sqlx::query_as::<_, ConversationTurn>(
            r#"
            SELECT id, interview_id, speaker, message, timestamp
            FROM conversation_turns
            WHERE interview_id = $1
            ORDER BY timestamp ASC
            "#,
        )
        .bind(interview_id)
        .fetch_all(&self.pool)
        .await?)
    }
}

#[async_trait]
impl InterviewRepository for PgStore {
    async fn find_interview(&self, interview_id: Uuid) -> Result<Option<Interview>> {
        Ok(
            sqlx::query_as::<_, Interview>("SELECT * FROM interviews WHERE id = $1")
                .bind(interview_id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn load_context(&self, interview_id: Uuid) -> Result<Option<InterviewContext>> {
        let Some(interview) = self.find_interview(interview_id).await? else {
            return Ok(None);
        };

        let job = sqlx::query_as::<_, JobFacts>(
            "SELECT title, experience_level, skills_required FROM jobs WHERE id = $1",
        )
        .bind(interview.job_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| anyhow!("Job {} of interview {interview_id} is missing", interview.job_id))?;

        let candidate = sqlx::query_as::<_, CandidateFacts>(
            r#"
            SELECT id, full_name, experience_years, current_company, resume_summary, resume_s3_key
            FROM candidates
            WHERE id = $1
            "#,
        )
        .bind(interview.candidate_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| {
            anyhow!(
                "Candidate {} of interview {interview_id} is missing",
                interview.candidate_id
            )
        })?;

        let agent = match interview.agent_id {
            Some(agent_id) => {
                sqlx::query_as::<_, AgentPersona>(
                    "SELECT id, name, system_prompt, interview_type FROM agents WHERE id = $1",
                )
                .bind(agent_id)
                .fetch_optional(&self.pool)
                .await?
            }
            None => None,
        };

        let job_questions: Vec<String> = sqlx::query_scalar(
            "SELECT question_text FROM job_custom_questions WHERE job_id = $1 ORDER BY id",
        )
        .bind(interview.job_id)
        .fetch_all(&self.pool)
        .await?;

        let agent_questions: Vec<String> = match &agent {
            Some(agent) => {
                sqlx::query_scalar(
                    "SELECT question_text FROM default_questions WHERE agent_id = $1 ORDER BY id",
                )
                .bind(agent.id)
                .fetch_all(&self.pool)
                .await?
            }
            None => Vec::new(),
        };

        Ok(Some(InterviewContext {
            interview,
            job,
            candidate,
            agent,
            job_questions,
            agent_questions,
        }))
    }

    async fn save_interview_transition(
        &self,
        interview: &Interview,
        expected: InterviewStatus,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE interviews
            SET status = $2,
                started_at = $3,
                completed_at = $4,
                cancelled_at = $5,
                cancelled_by = $6,
                cancellation_reason = $7,
                updated_at = $8
            WHERE id = $1 AND status = $9
            "#,
        )
        .bind(interview.id)
        .bind(interview.status)
        .bind(interview.started_at)
        .bind(interview.completed_at)
        .bind(interview.cancelled_at)
        .bind(interview.cancelled_by)
        .bind(&interview.cancellation_reason)
        .bind(interview.updated_at)
        .bind(expected)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn open_session(
        &self,
        interview_id: Uuid,
        device_info: Option<&str>,
    ) -> Result<InterviewSession> {
        // Aggregate without GROUP BY always yields one row, so the first attempt gets 1.
        let session = sqlx::query_as::<_, InterviewSession>(
            r#"
            INSERT INTO interview_sessions
                (id, interview_id, session_number, status, is_primary, url_opened_at, device_info)
            SELECT $1, $2, COALESCE(MAX(session_number), 0) + 1, 'waiting'::session_status, COUNT(*) = 0, now(), $3
            FROM interview_sessions
            WHERE interview_id = $2
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(interview_id)
        .bind(device_info)
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("Failed to open session for interview {interview_id}"))?;

        info!(
            "Opened session #{} ({}) for interview {interview_id}",
            session.session_number, session.id
        );
        Ok(session)
    }

    async fn find_session(&self, session_id: Uuid) -> Result<Option<InterviewSession>> {
        Ok(
            sqlx::query_as::<_, InterviewSession>("SELECT * FROM interview_sessions WHERE id = $1")
                .bind(session_id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn list_sessions(&self, interview_id: Uuid) -> Result<Vec<InterviewSession>> {
        Ok(sqlx::query_as::<_, InterviewSession>(
            "SELECT * FROM interview_sessions WHERE interview_id = $1 ORDER BY session_number",
        )
        .bind(interview_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn save_session_transition(
        &self,
        session: &InterviewSession,
        expected: SessionStatus,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE interview_sessions
            SET status = $2,
                started_at = $3,
                ended_at = $4,
                actual_duration_minutes = $5,
                last_activity_at = $6,
                network_interruptions = $7,
                questions_answered = $8,
                completion_percentage = $9,
                session_quality_score = $10,
                audio_quality = $11,
                video_quality = $12,
                updated_at = $13
            WHERE id = $1 AND status = $14
            "#,
        )
        .bind(session.id)
        .bind(session.status)
        .bind(session.started_at)
        .bind(session.ended_at)
        .bind(session.actual_duration_minutes)
        .bind(session.last_activity_at)
        .bind(session.network_interruptions)
        .bind(session.questions_answered)
        .bind(session.completion_percentage)
        .bind(session.session_quality_score)
        .bind(session.audio_quality)
        .bind(session.video_quality)
        .bind(session.updated_at)
        .bind(expected)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl ProctoringRepository for PgStore {
    async fn insert_screenshot(&self, screenshot: NewScreenshot) -> Result<Screenshot> {
        Ok(sqlx::query_as::<_, Screenshot>(
            r#"
            INSERT INTO interview_screenshots
                (id, interview_id, session_id, sequence_number, s3_key, face_count,
                 multiple_people_detected, issue_type, confidence, metadata)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(screenshot.interview_id)
        .bind(screenshot.session_id)
        .bind(screenshot.sequence_number)
        .bind(&screenshot.s3_key)
        .bind(screenshot.face_count)
        .bind(screenshot.multiple_people_detected)
        .bind(screenshot.issue_type)
        .bind(screenshot.confidence)
        .bind(&screenshot.metadata)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn list_screenshots(&self, interview_id: Uuid) -> Result<Vec<Screenshot>> {
        Ok(sqlx::query_as::<_, Screenshot>(
            r#"
            SELECT * FROM interview_screenshots
            WHERE interview_id = $1
            ORDER BY sequence_number, captured_at
            "#,
        )
        .bind(interview_id)
        .fetch_all(&self.pool)
        .await?)
    }
}

#[async_trait]
impl ResultRepository for PgStore {
    async fn find_result(&self, interview_id: Uuid) -> Result<Option<EvaluationResult>> {
        Ok(sqlx::query_as::<_, EvaluationResult>(
            "SELECT * FROM evaluation_results WHERE interview_id = $1",
        )
        .bind(interview_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn insert_result(&self, result: &EvaluationResult) -> Result<InsertOutcome> {
        let inserted = sqlx::query_as::<_, EvaluationResult>(
            r#"
            INSERT INTO evaluation_results
                (id, interview_id, overall_score, technical_score, communication_score,
                 cultural_fit_score, behavioral_score, recommendation, strengths, weaknesses,
                 red_flags, questions_asked, transcript, behavioral_analysis, skill_assessment,
                 ai_feedback, interview_quality, technical_depth, generated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
            ON CONFLICT (interview_id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(result.id)
        .bind(result.interview_id)
        .bind(result.overall_score)
        .bind(result.technical_score)
        .bind(result.communication_score)
        .bind(result.cultural_fit_score)
        .bind(result.behavioral_score)
        .bind(result.recommendation)
        .bind(&result.strengths)
        .bind(&result.weaknesses)
        .bind(&result.red_flags)
        .bind(&result.questions_asked)
        .bind(&result.transcript)
        .bind(&result.behavioral_analysis)
        .bind(&result.skill_assessment)
        .bind(&result.ai_feedback)
        .bind(result.interview_quality)
        .bind(result.technical_depth)
        .bind(result.generated_at)
        .fetch_optional(&self.pool)
        .await?;

        match inserted {
            Some(row) => Ok(InsertOutcome::Inserted(row)),
            None => {
                info!(
                    "Result for interview {} already stored by a concurrent writer",
                    result.interview_id
                );
                let existing = self.find_result(result.interview_id).await?.ok_or_else(|| {
                    anyhow!(
                        "Result for interview {} conflicted but could not be read back",
                        result.interview_id
                    )
                })?;
                Ok(InsertOutcome::Existing(existing))
            }
        }
    }
}
