use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use uuid::Uuid;

use crate::errors::AppError;
use crate::proctoring::ingest::{ingest_screenshot, ScreenshotReceipt, ScreenshotUpload};
use crate::state::AppState;

fn parse_uuid(field: &str, value: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(value.trim())
        .map_err(|_| AppError::Validation(format!("{field} must be a UUID")))
}

/// POST /api/v1/screenshots
/// Multipart fields: `interviewId`, `image`, `sequenceNumber`, optional `sessionId`.
pub async fn handle_upload_screenshot(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ScreenshotReceipt>), AppError> {
    let mut interview_id = None;
    let mut session_id = None;
    let mut sequence_number = None;
    let mut image: Option<Bytes> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Unreadable image field: {e}")))?;
                image = Some(bytes);
            }
            "interviewId" | "sessionId" | "sequenceNumber" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Unreadable {name} field: {e}")))?;
                match name.as_str() {
                    "interviewId" => interview_id = Some(parse_uuid("interviewId", &text)?),
                    "sessionId" if !text.trim().is_empty() => {
                        session_id = Some(parse_uuid("sessionId", &text)?)
                    }
                    "sequenceNumber" => {
                        sequence_number = Some(text.trim().parse::<i32>().map_err(|_| {
                            AppError::Validation("sequenceNumber must be an integer".to_string())
                        })?)
                    }
                    _ => {}
                }
            }
            _ => {}
        }
    }

    let upload = ScreenshotUpload {
        interview_id: interview_id
            .ok_or_else(|| AppError::Validation("interviewId is required".to_string()))?,
        session_id,
        sequence_number: sequence_number
            .ok_or_else(|| AppError::Validation("sequenceNumber is required".to_string()))?,
        image: image
            .filter(|b| !b.is_empty())
            .ok_or_else(|| AppError::Validation("image is required".to_string()))?,
    };

    let receipt = ingest_screenshot(&state, upload).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}
