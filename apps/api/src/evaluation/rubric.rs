//! Field-by-field validation of the model's rubric payload.
//!
//! The payload is untrusted: every score may be missing, out of range, a string
//! or garbage. Each field is read on its own with a default, so one bad field
//! never discards the rest. Only a payload that is not a JSON object at all
//! is reported as malformed, and the caller substitutes `fallback_rubric`.

use serde_json::Value;
use thiserror::Error;

use crate::llm_client::strip_json_fences;
use crate::models::evaluation::{
    BehavioralAnalysis, Recommendation, ScoringSource, SkillAssessment,
};

pub const DEFAULT_SCORE: f64 = 5.0;
pub const DEFAULT_QUALITY: i32 = 5;
pub const MIN_SCORE: f64 = 1.0;
pub const MAX_SCORE: f64 = 10.0;

#[derive(Debug, Error)]
pub enum RubricError {
    #[error("rubric payload is empty")]
    Empty,

    #[error("rubric payload is not JSON: {0}")]
    NotJson(#[from] serde_json::Error),

    #[error("rubric payload is not a JSON object")]
    NotAnObject,
}

/// Validated rubric output, before proctoring fusion.
#[derive(Debug, Clone, PartialEq)]
pub struct RubricScores {
    pub overall_score: f64,
    pub technical_score: f64,
    pub communication_score: f64,
    pub cultural_fit_score: f64,
    pub behavioral_score: f64,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub red_flags: Vec<String>,
    pub recommendation: Recommendation,
    pub interview_quality: i32,
    pub technical_depth: i32,
    pub behavioral_analysis: BehavioralAnalysis,
    pub skill_assessment: SkillAssessment,
    pub summary: String,
    pub hiring_justification: String,
    pub source: ScoringSource,
}

/// Neutral payload used when the model's answer is unusable.
pub fn fallback_rubric() -> RubricScores {
    RubricScores {
        overall_score: DEFAULT_SCORE,
        technical_score: DEFAULT_SCORE,
        communication_score: DEFAULT_SCORE,
        cultural_fit_score: DEFAULT_SCORE,
        behavioral_score: DEFAULT_SCORE,
        strengths: Vec::new(),
        weaknesses: Vec::new(),
        red_flags: Vec::new(),
        recommendation: Recommendation::Maybe,
        interview_quality: DEFAULT_QUALITY,
        technical_depth: DEFAULT_QUALITY,
        behavioral_analysis: BehavioralAnalysis::default(),
        skill_assessment: SkillAssessment::default(),
        summary: "Interview completed. Manual review recommended as AI scoring was unavailable."
            .to_string(),
        hiring_justification: "Recommend manual review of the transcript.".to_string(),
        source: ScoringSource::Fallback,
    }
}

fn as_number(value: Option<&Value>) -> Option<f64> {
    let n = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

/// Clamped to [1, 10], rounded to one decimal. Missing or non-numeric reads as 5.0.
pub fn read_score(value: Option<&Value>) -> f64 {
    let raw = as_number(value).unwrap_or(DEFAULT_SCORE);
    (raw.clamp(MIN_SCORE, MAX_SCORE) * 10.0).round() / 10.0
}

/// Truncated toward zero and clamped to [1, 10]. Missing reads as 5.
pub fn read_quality(value: Option<&Value>) -> i32 {
    as_number(value)
        .map(|n| (n.trunc() as i64).clamp(1, 10) as i32)
        .unwrap_or(DEFAULT_QUALITY)
}

/// Non-string entries are dropped, blanks trimmed away.
fn read_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn read_text(value: Option<&Value>, default: &str) -> String {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(default)
        .to_string()
}

fn read_level(value: Option<&Value>) -> String {
    match value.and_then(Value::as_str).map(|s| s.trim().to_ascii_lowercase()) {
        Some(level) if matches!(level.as_str(), "high" | "medium" | "low") => level,
        _ => "medium".to_string(),
    }
}

pub fn parse_rubric(raw: &str) -> Result<RubricScores, RubricError> {
    let text = strip_json_fences(raw);
    if text.is_empty() {
        return Err(RubricError::Empty);
    }
    let value: Value = serde_json::from_str(text)?;
    let obj = value.as_object().ok_or(RubricError::NotAnObject)?;

    let behavioral = obj.get("behavioral_analysis");
    let skills = obj.get("skill_assessment");
    let feedback = obj.get("ai_feedback");
    let fallback = fallback_rubric();

    Ok(RubricScores {
        overall_score: read_score(obj.get("overall_score")),
        technical_score: read_score(obj.get("technical_score")),
        communication_score: read_score(obj.get("communication_score")),
        cultural_fit_score: read_score(obj.get("cultural_fit_score")),
        behavioral_score: read_score(obj.get("behavioral_score")),
        strengths: read_list(obj.get("strengths")),
        weaknesses: read_list(obj.get("weaknesses")),
        red_flags: read_list(obj.get("red_flags")),
        recommendation: obj
            .get("recommendation")
            .and_then(Value::as_str)
            .and_then(Recommendation::parse)
            .unwrap_or(Recommendation::Maybe),
        interview_quality: read_quality(obj.get("interview_quality")),
        technical_depth: read_quality(obj.get("technical_depth")),
        behavioral_analysis: BehavioralAnalysis {
            confidence_level: read_level(behavioral.and_then(|b| b.get("confidence_level"))),
            engagement: read_level(behavioral.and_then(|b| b.get("engagement"))),
            clarity: read_level(behavioral.and_then(|b| b.get("clarity"))),
        },
        skill_assessment: SkillAssessment {
            relevant_skills_demonstrated: read_list(
                skills.and_then(|s| s.get("relevant_skills_demonstrated")),
            ),
            missing_skills: read_list(skills.and_then(|s| s.get("missing_skills"))),
        },
        summary: read_text(feedback.and_then(|f| f.get("summary")), &fallback.summary),
        hiring_justification: read_text(
            feedback.and_then(|f| f.get("hiring_justification")),
            &fallback.hiring_justification,
        ),
        source: ScoringSource::Model,
    })
}
