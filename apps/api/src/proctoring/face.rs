//! Tier 1 proctoring: a per-upload face count, classified by fixed rules.
//!
//! Detection itself runs in a sidecar service; this module only turns its
//! detections into an issue type and a confidence.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::models::screenshot::IssueType;

/// Rule-based confidence for "nobody in frame".
pub const NO_FACE_CONFIDENCE: f64 = 0.95;
/// Rule-based confidence for "more than one person in frame".
pub const MULTIPLE_FACES_CONFIDENCE: f64 = 0.90;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct FaceDetection {
    pub score: f64,
}

#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("face detector unreachable: {0}")]
    Http(#[from] reqwest::Error),

    #[error("face detector returned {status}: {body}")]
    Status { status: u16, body: String },
}

#[async_trait]
pub trait FaceDetector: Send + Sync {
    async fn detect(&self, image: Bytes, content_type: &str)
        -> Result<Vec<FaceDetection>, DetectorError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceClassification {
    pub face_count: i32,
    pub multiple_people_detected: bool,
    pub issue_type: IssueType,
    pub confidence: f64,
}

impl FaceClassification {
    /// Recorded when the detector could not analyze the image.
    pub fn unanalyzed() -> Self {
        Self {
            face_count: 0,
            multiple_people_detected: false,
            issue_type: IssueType::None,
            confidence: 0.0,
        }
    }
}

pub fn classify_faces(detections: &[FaceDetection]) -> FaceClassification {
    let face_count = detections.len() as i32;
    match detections {
        [] => FaceClassification {
            face_count,
            multiple_people_detected: false,
            issue_type: IssueType::NoFace,
            confidence: NO_FACE_CONFIDENCE,
        },
        [only] => FaceClassification {
            face_count,
            multiple_people_detected: false,
            issue_type: IssueType::None,
            confidence: only.score.clamp(0.0, 1.0),
        },
        _ => FaceClassification {
            face_count,
            multiple_people_detected: true,
            issue_type: IssueType::MultiplePeople,
            confidence: MULTIPLE_FACES_CONFIDENCE,
        },
    }
}

// ────────────────────────────────────────────────────────────────────────────
// HTTP sidecar
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct DetectResponse {
    #[serde(default)]
    detections: Vec<FaceDetection>,
}

/// Posts raw image bytes to `{base}/detect`, expects `{"detections":[{"score":..}]}`.
pub struct HttpFaceDetector {
    client: Client,
    url: String,
}

impl HttpFaceDetector {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            url: format!("{}/detect", base_url.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl FaceDetector for HttpFaceDetector {
    async fn detect(
        &self,
        image: Bytes,
        content_type: &str,
    ) -> Result<Vec<FaceDetection>, DetectorError> {
        let response = self
            .client
            .post(&self.url)
            .header("content-type", content_type)
            .body(image)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DetectorError::Status {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let parsed: DetectResponse = response.json().await?;
        debug!("Face detector found {} face(s)", parsed.detections.len());
        Ok(parsed.detections)
    }
}
