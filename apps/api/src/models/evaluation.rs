use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::proctoring::integrity::ProctoringSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "recommendation", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    Hire,
    Reject,
    Maybe,
    SecondRound,
}

impl Recommendation {
    /// Strict parse of the model's value; anything unknown is rejected.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "hire" => Some(Recommendation::Hire),
            "reject" => Some(Recommendation::Reject),
            "maybe" => Some(Recommendation::Maybe),
            "second_round" => Some(Recommendation::SecondRound),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehavioralAnalysis {
    pub confidence_level: String,
    pub engagement: String,
    pub clarity: String,
}

impl Default for BehavioralAnalysis {
    fn default() -> Self {
        Self {
            confidence_level: "medium".to_string(),
            engagement: "medium".to_string(),
            clarity: "medium".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkillAssessment {
    pub relevant_skills_demonstrated: Vec<String>,
    pub missing_skills: Vec<String>,
}

/// Where the scores in a result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringSource {
    Model,
    /// The model answered but its payload was unusable; neutral scores were substituted.
    Fallback,
    /// No dialogue was recorded, no model was invoked.
    NoData,
}

/// Feedback payload stored with a result. Carries the proctoring summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationFeedback {
    pub summary: String,
    pub hiring_justification: String,
    pub scoring_source: ScoringSource,
    pub proctoring: ProctoringSummary,
}

/// The single fused outcome of an interview. Written once, never mutated by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct EvaluationResult {
    pub id: Uuid,
    pub interview_id: Uuid,
    pub overall_score: f64,
    pub technical_score: f64,
    pub communication_score: f64,
    pub cultural_fit_score: f64,
    pub behavioral_score: f64,
    pub recommendation: Recommendation,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub red_flags: Vec<String>,
    pub questions_asked: Vec<String>,
    pub transcript: String,
    pub behavioral_analysis: Json<BehavioralAnalysis>,
    pub skill_assessment: Json<SkillAssessment>,
    pub ai_feedback: Json<EvaluationFeedback>,
    pub interview_quality: i32,
    pub technical_depth: i32,
    pub generated_at: DateTime<Utc>,
}
