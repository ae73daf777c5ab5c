//! Evaluation Fusion Engine — produces the single result of a completed interview.
//!
//! Flow: existing result? → completed? → turns → rubric call → parse or fall back →
//!       integrity analysis → fuse → insert (unique per interview) → notify.
//!
//! A model outage on the rubric call fails the whole operation with nothing
//! written, so it can be retried. An unusable rubric answer does not fail: the
//! neutral fallback is stored and marked as such.

use chrono::Utc;
use sqlx::types::Json;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::evaluation::fusion::{fuse, questions_asked, render_transcript};
use crate::evaluation::prompts::{RUBRIC_PROMPT_TEMPLATE, RUBRIC_SYSTEM};
use crate::evaluation::rubric::{fallback_rubric, parse_rubric, RubricScores};
use crate::lifecycle::interview::TransitionError;
use crate::lifecycle::service::load_interview;
use crate::llm_client::prompts::EVIDENCE_INSTRUCTION;
use crate::llm_client::{complete_within, ChatMessage, CompletionRequest};
use crate::models::evaluation::{
    BehavioralAnalysis, EvaluationFeedback, EvaluationResult, Recommendation, ScoringSource,
    SkillAssessment,
};
use crate::models::interview::{InterviewContext, InterviewStatus};
use crate::notifications::{dispatch, InterviewEvent};
use crate::proctoring::integrity::{analyze_integrity, ProctoringSummary};
use crate::state::AppState;
use crate::store::InsertOutcome;

const RUBRIC_MAX_TOKENS: u32 = 1000;
const RUBRIC_TEMPERATURE: f32 = 0.3;

pub const NO_DATA_FLAG: &str = "No conversation data";
pub const NO_DATA_TRANSCRIPT: &str = "No conversation recorded.";

fn build_rubric_prompt(ctx: &InterviewContext, transcript: &str) -> String {
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

    RUBRIC_PROMPT_TEMPLATE
        .replace("{job_title}", &ctx.job.title)
        .replace("{experience_level}", &ctx.job.experience_level)
        .replace("{skills}", &skills)
        .replace("{candidate_name}", &ctx.candidate.full_name)
        .replace("{experience}", &experience)
        .replace("{evidence_instruction}", EVIDENCE_INSTRUCTION)
        .replace("{transcript}", transcript)
}

fn empty_result(interview_id: Uuid) -> EvaluationResult {
    EvaluationResult {
        id: Uuid::new_v4(),
        interview_id,
        overall_score: 0.0,
        technical_score: 0.0,
        communication_score: 0.0,
        cultural_fit_score: 0.0,
        behavioral_score: 0.0,
        recommendation: Recommendation::Maybe,
        strengths: Vec::new(),
        weaknesses: vec!["No conversation data recorded".to_string()],
        red_flags: vec![NO_DATA_FLAG.to_string()],
        questions_asked: Vec::new(),
        transcript: NO_DATA_TRANSCRIPT.to_string(),
        behavioral_analysis: Json(BehavioralAnalysis::default()),
        skill_assessment: Json(SkillAssessment::default()),
        ai_feedback: Json(EvaluationFeedback {
            summary: "No conversation was recorded for this interview.".to_string(),
            hiring_justification: "Recommend manual review or rescheduling.".to_string(),
            scoring_source: ScoringSource::NoData,
            proctoring: ProctoringSummary::default(),
        }),
        interview_quality: 0,
        technical_depth: 0,
        generated_at: Utc::now(),
    }
}

fn scored_result(
    interview_id: Uuid,
    scores: RubricScores,
    transcript: String,
    questions: Vec<String>,
    proctoring: ProctoringSummary,
) -> EvaluationResult {
    EvaluationResult {
        id: Uuid::new_v4(),
        interview_id,
        overall_score: scores.overall_score,
        technical_score: scores.technical_score,
        communication_score: scores.communication_score,
        cultural_fit_score: scores.cultural_fit_score,
        behavioral_score: scores.behavioral_score,
        recommendation: scores.recommendation,
        strengths: scores.strengths,
        weaknesses: scores.weaknesses,
        red_flags: scores.red_flags,
        questions_asked: questions,
        transcript,
        behavioral_analysis: Json(scores.behavioral_analysis),
        skill_assessment: Json(scores.skill_assessment),
        ai_feedback: Json(EvaluationFeedback {
            summary: scores.summary,
            hiring_justification: scores.hiring_justification,
            scoring_source: scores.source,
            proctoring,
        }),
        interview_quality: scores.interview_quality,
        technical_depth: scores.technical_depth,
        generated_at: Utc::now(),
    }
}

async fn store_result(
    state: &AppState,
    candidate: EvaluationResult,
) -> Result<EvaluationResult, AppError> {
    match state.store.insert_result(&candidate).await? {
        InsertOutcome::Inserted(result) => {
            info!(
                "Result {} generated for interview {}: score={}, recommendation={:?}",
                result.id, result.interview_id, result.overall_score, result.recommendation
            );
            dispatch(
                state.notifier.clone(),
                InterviewEvent::EvaluationGenerated {
                    interview_id: result.interview_id,
                    result_id: result.id,
                    overall_score: result.overall_score,
                    recommendation: result.recommendation,
                },
            );
            Ok(result)
        }
        InsertOutcome::Existing(result) => {
            info!(
                "Interview {} already had result {}; keeping it",
                result.interview_id, result.id
            );
            Ok(result)
        }
    }
}

/// Returns the interview's result, generating it on first call.
pub async fn generate(state: &AppState, interview_id: Uuid) -> Result<EvaluationResult, AppError> {
    // Step 1: Idempotency guard
    if let Some(existing) = state.store.find_result(interview_id).await? {
        info!("Result already exists for interview {interview_id}");
        return Ok(existing);
    }

    let interview = load_interview(state, interview_id).await?;
    if interview.status != InterviewStatus::Completed {
        return Err(TransitionError::Interview {
            id: interview_id,
            action: "evaluate",
            from: interview.status,
        }
        .into());
    }

    // Step 2: Nothing said, nothing to score
    let turns = state.store.list_turns(interview_id).await?;
    if turns.is_empty() {
        warn!("No conversation data for interview {interview_id}");
        return store_result(state, empty_result(interview_id)).await;
    }

    let ctx = state
        .store
        .load_context(interview_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Interview {interview_id} not found")))?;
    let transcript = render_transcript(&turns);
    let questions = questions_asked(&turns);

    // Step 3: Rubric call; outage aborts, garbage falls back
    let request = CompletionRequest {
        system: RUBRIC_SYSTEM.to_string(),
        messages: vec![ChatMessage::user(build_rubric_prompt(&ctx, &transcript))],
        max_tokens: RUBRIC_MAX_TOKENS,
        temperature: RUBRIC_TEMPERATURE,
    };
    let raw = complete_within(state.llm.as_ref(), &request, state.config.llm_timeout).await?;

    // Step 4: Validate field by field
    let scores = match parse_rubric(&raw) {
        Ok(scores) => scores,
        Err(e) => {
            warn!("Rubric for interview {interview_id} unusable ({e}); using neutral fallback");
            fallback_rubric()
        }
    };

    // Step 5: Proctoring fusion
    let screenshots = state.store.list_screenshots(interview_id).await?;
    let proctoring = analyze_integrity(
        &screenshots,
        state.llm.as_ref(),
        state.blobs.as_ref(),
        state.config.llm_timeout,
    )
    .await;
    let scores = fuse(scores, &proctoring);

    // Step 6: Persist once
    store_result(
        state,
        scored_result(interview_id, scores, transcript, questions, proctoring),
    )
    .await
}

/// Runs `generate` on a background task; failures are logged for a later retry.
pub fn spawn_generation(state: AppState, interview_id: Uuid) {
    tokio::spawn(async move {
        if let Err(e) = generate(&state, interview_id).await {
            error!("Background evaluation of interview {interview_id} failed: {e}");
        }
    });
}
