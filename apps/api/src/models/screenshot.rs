use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "screenshot_issue", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    None,
    MultiplePeople,
    NoFace,
    LookingAway,
    PhoneDetected,
}

/// A single proctoring capture. Immutable once analyzed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Screenshot {
    pub id: Uuid,
    pub interview_id: Uuid,
    pub session_id: Option<Uuid>,
    pub sequence_number: i32,
    pub s3_key: String,
    pub face_count: i32,
    pub multiple_people_detected: bool,
    pub issue_type: IssueType,
    pub confidence: f64,
    pub metadata: Value,
    pub captured_at: DateTime<Utc>,
}
