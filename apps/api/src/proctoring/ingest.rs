use std::io::Cursor;

use bytes::Bytes;
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::interview::InterviewStatus;
use crate::proctoring::face::{classify_faces, FaceClassification};
use crate::state::AppState;
use crate::storage::screenshot_key;
use crate::store::NewScreenshot;

#[derive(Debug, Clone)]
pub struct ScreenshotUpload {
    pub interview_id: Uuid,
    pub session_id: Option<Uuid>,
    pub sequence_number: i32,
    pub image: Bytes,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenshotReceipt {
    pub screenshot_id: Uuid,
    pub interview_id: Uuid,
    pub sequence_number: i32,
    #[serde(flatten)]
    pub classification: FaceClassification,
    /// False when the face detector was unavailable and a neutral record was kept.
    pub analyzed: bool,
}

/// Stores one capture and classifies it synchronously.
///
/// Steps:
/// 1. Validate the interview accepts captures (scheduled or in progress) and the session belongs to it
/// 2. Sniff the image format and read its dimensions
/// 3. Upload to object storage
/// 4. Run the face detector; an outage is recorded, not raised
/// 5. Persist the screenshot row
pub async fn ingest_screenshot(
    state: &AppState,
    upload: ScreenshotUpload,
) -> Result<ScreenshotReceipt, AppError> {
    if upload.sequence_number < 0 {
        return Err(AppError::Validation(
            "sequenceNumber must not be negative".to_string(),
        ));
    }

    // Step 1: Interview and session checks
    let interview = state
        .store
        .find_interview(upload.interview_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Interview {} not found", upload.interview_id)))?;

    if !matches!(
        interview.status,
        InterviewStatus::Scheduled | InterviewStatus::InProgress
    ) {
        return Err(AppError::InvalidStateTransition(format!(
            "Interview {} is {}; screenshots are only accepted while scheduled or in progress",
            interview.id,
            interview.status.as_str()
        )));
    }

    if let Some(session_id) = upload.session_id {
        let session = state
            .store
            .find_session(session_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Session {session_id} not found")))?;
        if session.interview_id != interview.id {
            return Err(AppError::Validation(format!(
                "Session {session_id} does not belong to interview {}",
                interview.id
            )));
        }
    }

    // Step 2: Format and dimensions
    let format = image::guess_format(&upload.image)
        .map_err(|_| AppError::Validation("Unsupported image format".to_string()))?;
    let (width, height) = image::ImageReader::with_format(Cursor::new(&upload.image[..]), format)
        .into_dimensions()
        .map_err(|e| AppError::Validation(format!("Unreadable image: {e}")))?;
    let mime = format.to_mime_type();
    let extension = format.extensions_str().first().copied().unwrap_or("img");

    // Step 3: Object storage
    let s3_key = screenshot_key(interview.id, upload.sequence_number, extension);
    state.blobs.put(&s3_key, upload.image.clone(), mime).await?;

    // Step 4: Face classification
    let mut metadata = json!({
        "width": width,
        "height": height,
        "content_type": mime,
        "size_bytes": upload.image.len(),
    });
    let (classification, analyzed) = match state.face_detector.detect(upload.image, mime).await {
        Ok(detections) => (classify_faces(&detections), true),
        Err(e) => {
            warn!(
                "Face detection failed for interview {} seq {}: {e}",
                interview.id, upload.sequence_number
            );
            metadata["analysis_error"] = json!(e.to_string());
            (FaceClassification::unanalyzed(), false)
        }
    };

    // Step 5: Persist
    let screenshot = state
        .store
        .insert_screenshot(NewScreenshot {
            interview_id: interview.id,
            session_id: upload.session_id,
            sequence_number: upload.sequence_number,
            s3_key,
            face_count: classification.face_count,
            multiple_people_detected: classification.multiple_people_detected,
            issue_type: classification.issue_type,
            confidence: classification.confidence,
            metadata,
        })
        .await?;

    info!(
        "Screenshot {} stored for interview {} (seq {}, {} face(s), issue {:?})",
        screenshot.id,
        interview.id,
        screenshot.sequence_number,
        classification.face_count,
        classification.issue_type
    );

    Ok(ScreenshotReceipt {
        screenshot_id: screenshot.id,
        interview_id: interview.id,
        sequence_number: screenshot.sequence_number,
        classification,
        analyzed,
    })
}
