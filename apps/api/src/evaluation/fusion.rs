//! Deterministic fusion of rubric scores with the proctoring summary.
//!
//! Flags are appended to the model's red flags. High severity is a policy
//! override applied after scoring: the recommendation becomes `reject` and the
//! overall score is capped, whatever the model said.

use tracing::info;

use crate::evaluation::rubric::RubricScores;
use crate::models::conversation::{ConversationTurn, Speaker};
use crate::models::evaluation::Recommendation;
use crate::proctoring::integrity::{ProctoringSummary, Severity};

pub const HIGH_SEVERITY_SCORE_CAP: f64 = 3.0;

pub fn fuse(mut scores: RubricScores, proctoring: &ProctoringSummary) -> RubricScores {
    for flag in &proctoring.flags {
        if !scores.red_flags.contains(flag) {
            scores.red_flags.push(flag.clone());
        }
    }

    if proctoring.severity == Severity::High {
        info!(
            "Proctoring override: recommendation {:?} → Reject, overall {} capped at {}",
            scores.recommendation, scores.overall_score, HIGH_SEVERITY_SCORE_CAP
        );
        scores.recommendation = Recommendation::Reject;
        scores.overall_score = scores.overall_score.min(HIGH_SEVERITY_SCORE_CAP);
    }
    scores
}

/// `"<Speaker>: <message>"` lines in order, separated by blank lines.
pub fn render_transcript(turns: &[ConversationTurn]) -> String {
    turns
        .iter()
        .map(|t| format!("{}: {}", t.speaker.transcript_label(), t.message))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Every AI message, in order.
pub fn questions_asked(turns: &[ConversationTurn]) -> Vec<String> {
    turns
        .iter()
        .filter(|t| t.speaker == Speaker::Ai)
        .map(|t| t.message.clone())
        .collect()
}
