//! Conversation Engine: one interviewer turn per request, no in-process memory.
//!
//! Flow per call: acquire the interview's turn lock → load context → rebuild the
//! dialogue from the turn log → call the model under a deadline → shape the
//! reply → persist → release the lock.
//!
//! Turns are written only after the model answered. A failed call therefore
//! leaves the log untouched and the client can resend the same message.

use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::conversation::history::History;
use crate::conversation::prompts::{
    COMPLETION_SENTINEL, DEFAULT_INTERVIEW_TYPE, DEFAULT_PERSONA, FALLBACK_QUESTIONS,
    START_INSTRUCTION_TEMPLATE, SYSTEM_PROMPT_TEMPLATE, TEXT_CHANNEL_RULES, VOICE_CHANNEL_RULES,
};
use crate::conversation::resume::resume_summary;
use crate::conversation::shaping::shape_reply;
use crate::errors::AppError;
use crate::evaluation;
use crate::lifecycle::interview::{ensure_accepts_messages, prepare_start, StartDisposition};
use crate::lifecycle::service::{begin_interview, complete_interview, load_interview};
use crate::llm_client::{complete_within, ChatRole, CompletionRequest};
use crate::models::conversation::{ConversationTurn, Speaker};
use crate::models::evaluation::Recommendation;
use crate::models::interview::{InterviewContext, InterviewModality, InterviewStatus};
use crate::state::AppState;

const MAX_REPLY_TOKENS: u32 = 300;
const REPLY_TEMPERATURE: f32 = 0.7;

/// Greeting plus ice-breaker on top of the reference questions.
const EXTRA_TURNS: usize = 2;

/// Reply to `start` and `sendMessage`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnReply {
    pub message: String,
    /// Count of AI turns so far, this one included.
    pub question_number: usize,
    /// Reference questions + greeting + ice-breaker.
    pub total_questions: usize,
    pub is_complete: bool,
}

// ────────────────────────────────────────────────────────────────────────────
// Prompt assembly
// ────────────────────────────────────────────────────────────────────────────

/// Job questions, then persona questions, both in insertion order.
/// Falls back to five generic questions when both lists are empty.
pub fn reference_questions(ctx: &InterviewContext) -> Vec<String> {
    let questions: Vec<String> = ctx
        .job_questions
        .iter()
        .chain(ctx.agent_questions.iter())
        .cloned()
        .collect();

    if questions.is_empty() {
        FALLBACK_QUESTIONS.iter().map(|q| q.to_string()).collect()
    } else {
        questions
    }
}

pub fn start_instruction(ctx: &InterviewContext) -> String {
    START_INSTRUCTION_TEMPLATE
        .replace("{first_name}", ctx.candidate.first_name())
        .replace("{job_title}", &ctx.job.title)
}

/// Deterministic: identical context, resume text and questions give an identical prompt.
pub fn build_system_prompt(ctx: &InterviewContext, resume: &str, questions: &[String]) -> String {
    let channel_rules = match ctx.interview.modality {
        InterviewModality::Voice => VOICE_CHANNEL_RULES,
        InterviewModality::Text => TEXT_CHANNEL_RULES,
    };
    let (persona, interview_type) = match &ctx.agent {
        Some(agent) => (agent.system_prompt.as_str(), agent.interview_type.as_str()),
        None => (DEFAULT_PERSONA, DEFAULT_INTERVIEW_TYPE),
    };
    let skills = if ctx.job.skills_required.is_empty() {
        "Not specified".to_string()
    } else {
        ctx.job.skills_required.join(", ")
    };
    let experience = ctx
        .candidate
        .experience_years
        .map(|years| format!("{years} years"))
        .unwrap_or_else(|| "Not specified".to_string());
    let numbered = questions
        .iter()
        .enumerate()
        .map(|(i, q)| format!("{}. {q}", i + 1))
        .collect::<Vec<_>>()
        .join("\n");

    SYSTEM_PROMPT_TEMPLATE
        .replace("{channel_rules}", channel_rules)
        .replace("{sentinel}", COMPLETION_SENTINEL)
        .replace("{interview_type}", interview_type)
        .replace("{job_title}", &ctx.job.title)
        .replace("{experience_level}", &ctx.job.experience_level)
        .replace("{skills}", &skills)
        .replace("{candidate_name}", &ctx.candidate.full_name)
        .replace("{experience}", &experience)
        .replace(
            "{current_company}",
            ctx.candidate
                .current_company
                .as_deref()
                .unwrap_or("Not specified"),
        )
        .replace("{reference_questions}", &numbered)
        .replace("{persona}", persona)
        .replace("{resume}", resume)
}

fn ai_turn_count(turns: &[ConversationTurn]) -> usize {
    turns.iter().filter(|t| t.speaker == Speaker::Ai).count()
}

async fn load_context(state: &AppState, interview_id: Uuid) -> Result<InterviewContext, AppError> {
    state
        .store
        .load_context(interview_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Interview {interview_id} not found")))
}

async fn ask_model(
    state: &AppState,
    ctx: &InterviewContext,
    history: History,
) -> Result<String, AppError> {
    let questions = reference_questions(ctx);
    let resume = resume_summary(&ctx.candidate, state.blobs.as_ref()).await;

    debug!(
        "Interview {}: replaying {} history entries",
        ctx.interview.id,
        history.len()
    );
    let request = CompletionRequest {
        system: build_system_prompt(ctx, &resume, &questions),
        messages: history.into_messages(),
        max_tokens: MAX_REPLY_TOKENS,
        temperature: REPLY_TEMPERATURE,
    };

    Ok(complete_within(state.llm.as_ref(), &request, state.config.llm_timeout).await?)
}

// ────────────────────────────────────────────────────────────────────────────
// Operations
// ────────────────────────────────────────────────────────────────────────────

/// Opens (or resumes) the interview and returns the interviewer's greeting.
pub async fn start(state: &AppState, interview_id: Uuid) -> Result<TurnReply, AppError> {
    let lease = state.turn_lock.acquire(interview_id).await?;
    let outcome = start_locked(state, interview_id).await;
    state.turn_lock.release(lease).await;
    outcome
}

async fn start_locked(state: &AppState, interview_id: Uuid) -> Result<TurnReply, AppError> {
    // Step 1: Context and lifecycle gate
    let ctx = load_context(state, interview_id).await?;
    let disposition = prepare_start(&ctx.interview, chrono::Utc::now())?;
    let total_questions = reference_questions(&ctx).len() + EXTRA_TURNS;
    let turns = state.store.list_turns(interview_id).await?;
    let ai_turns = ai_turn_count(&turns);

    // Step 2: Reload of a running interview returns the last AI turn, no model call
    if disposition == StartDisposition::Resume {
        if let Some(last) = turns.iter().rev().find(|t| t.speaker == Speaker::Ai) {
            info!("Interview {interview_id} resumed at AI turn {ai_turns}");
            return Ok(TurnReply {
                message: last.message.clone(),
                question_number: ai_turns,
                total_questions,
                is_complete: false,
            });
        }
    }

    // Step 3: Ask for the greeting
    let instruction = start_instruction(&ctx);
    let mut history = History::from_turns(&turns, &instruction);
    if history.is_empty() {
        history.push(ChatRole::User, &instruction);
    }
    let raw = ask_model(state, &ctx, history).await?;
    let shaped = shape_reply(&raw);

    // Step 4: Transition, then persist the greeting
    begin_interview(state, &ctx.interview).await?;
    state
        .store
        .append_turn(interview_id, Speaker::Ai, &shaped.text)
        .await?;

    info!(
        "Interview {interview_id} started: greeting of {} chars",
        shaped.text.len()
    );
    Ok(TurnReply {
        message: shaped.text,
        question_number: ai_turns + 1,
        total_questions,
        is_complete: false,
    })
}

/// Records the candidate's answer and returns the interviewer's next turn.
pub async fn send_message(
    state: &AppState,
    interview_id: Uuid,
    candidate_text: &str,
) -> Result<TurnReply, AppError> {
    let candidate_text = candidate_text.trim();
    if candidate_text.is_empty() {
        return Err(AppError::Validation("message must not be empty".to_string()));
    }

    let lease = state.turn_lock.acquire(interview_id).await?;
    let outcome = send_message_locked(state, interview_id, candidate_text).await;
    state.turn_lock.release(lease).await;
    outcome
}

async fn send_message_locked(
    state: &AppState,
    interview_id: Uuid,
    candidate_text: &str,
) -> Result<TurnReply, AppError> {
    // Step 1: Context and lifecycle gate
    let ctx = load_context(state, interview_id).await?;
    ensure_accepts_messages(&ctx.interview)?;

    // Step 2: Rebuild the dialogue from the log, then add the new answer
    let turns = state.store.list_turns(interview_id).await?;
    let mut history = History::from_turns(&turns, &start_instruction(&ctx));
    history.push(ChatRole::User, candidate_text);

    // Step 3: Model call. Nothing is written if it fails.
    let raw = ask_model(state, &ctx, history).await?;
    if raw.trim().is_empty() {
        warn!("Interview {interview_id}: model returned an empty reply");
    }
    let shaped = shape_reply(&raw);

    // Step 4: Re-read the lifecycle, then persist the pair, candidate first
    let current = load_interview(state, interview_id).await?;
    if let Err(e) = ensure_accepts_messages(&current) {
        info!("Interview {interview_id} left in_progress during the model call; reply dropped");
        return Err(e.into());
    }
    state
        .store
        .append_turn(interview_id, Speaker::Candidate, candidate_text)
        .await?;
    state
        .store
        .append_turn(interview_id, Speaker::Ai, &shaped.text)
        .await?;

    let question_number = ai_turn_count(&turns) + 1;
    info!(
        "Interview {interview_id}: AI turn {question_number} recorded (complete: {})",
        shaped.is_complete
    );

    // Step 5: Natural end of the interview
    if shaped.is_complete {
        match complete_interview(state, interview_id).await {
            Ok(_) => evaluation::spawn_generation(state.clone(), interview_id),
            Err(e) => warn!("Interview {interview_id} signalled completion but was not completed: {e}"),
        }
    }

    Ok(TurnReply {
        message: shaped.text,
        question_number,
        total_questions: reference_questions(&ctx).len() + EXTRA_TURNS,
        is_complete: shaped.is_complete,
    })
}

/// Error payload embedded in a successful end response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationFailure {
    pub code: &'static str,
    pub message: String,
}

/// Reply to `endInterview`. Completion always stands; the evaluation half may have failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndReply {
    pub interview_id: Uuid,
    pub status: InterviewStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overall_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<Recommendation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluation_error: Option<EvaluationFailure>,
}

/// Explicit end of an in-progress interview, followed by synchronous evaluation.
pub async fn end_interview(state: &AppState, interview_id: Uuid) -> Result<EndReply, AppError> {
    let lease = state.turn_lock.acquire(interview_id).await?;
    let completed = complete_interview(state, interview_id).await;
    state.turn_lock.release(lease).await;
    let completed = completed?;

    let mut reply = EndReply {
        interview_id,
        status: completed.status,
        overall_score: None,
        recommendation: None,
        result_id: None,
        evaluation_error: None,
    };
    match evaluation::generate(state, interview_id).await {
        Ok(result) => {
            reply.overall_score = Some(result.overall_score);
            reply.recommendation = Some(result.recommendation);
            reply.result_id = Some(result.id);
        }
        Err(e) => {
            warn!("Interview {interview_id} completed but evaluation failed: {e}");
            reply.evaluation_error = Some(EvaluationFailure {
                code: e.code(),
                message: e.public_message(),
            });
        }
    }
    Ok(reply)
}
