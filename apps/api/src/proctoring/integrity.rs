//! Tier 2 proctoring: aggregate integrity analysis, run once per evaluation.
//!
//! A deterministic sample of at most ten screenshots is classified by a vision
//! model. Per-category tallies cross fixed thresholds to produce flags, and the
//! number of distinct flags sets the severity.
//!
//! `analyze_integrity` never fails. An image whose URL cannot be signed, whose
//! model call fails, or whose answer is not valid JSON is counted in
//! `failed_count` and left out of the tallies.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::llm_client::{
    complete_within, parse_json_payload, ChatMessage, CompletionRequest, LanguageModel,
};
use crate::models::screenshot::Screenshot;
use crate::proctoring::prompts::{VISION_CLASSIFY_PROMPT, VISION_SYSTEM};
use crate::storage::{BlobStore, PRESIGN_TTL};

pub const MAX_SAMPLE: usize = 10;

pub const MULTIPLE_PERSONS_THRESHOLD: u32 = 2;
pub const PHONE_THRESHOLD: u32 = 2;
pub const LOOKING_AWAY_THRESHOLD: u32 = 3;

pub const FLAG_EXTERNAL_ASSISTANCE: &str = "possible external assistance";
pub const FLAG_EXTERNAL_RESOURCES: &str = "possible use of external resources";
pub const FLAG_READING_MATERIAL: &str = "possible reading from external material";

/// One vision answer. Missing fields read as `false`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct VisionVerdict {
    #[serde(default)]
    pub multiple_persons: bool,
    #[serde(default)]
    pub phone_detected: bool,
    #[serde(default)]
    pub looking_away: bool,
    #[serde(default)]
    pub not_present: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[default]
    None,
    Medium,
    High,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProctoringSummary {
    pub total_screenshots: usize,
    pub analyzed_count: usize,
    pub failed_count: usize,
    pub multiple_person_count: u32,
    pub phone_detected_count: u32,
    pub looking_away_count: u32,
    pub not_present_count: u32,
    pub flags: Vec<String>,
    pub severity: Severity,
}

/// Evenly spaced sample: stride `max(1, total / 10)`, at most ten entries.
pub fn sample_screenshots(screenshots: &[Screenshot]) -> Vec<&Screenshot> {
    let stride = (screenshots.len() / MAX_SAMPLE).max(1);
    screenshots.iter().step_by(stride).take(MAX_SAMPLE).collect()
}

/// Pure tally → flags → severity.
pub fn summarize(total: usize, verdicts: &[VisionVerdict], failed: usize) -> ProctoringSummary {
    let count = |pick: fn(&VisionVerdict) -> bool| verdicts.iter().filter(|v| pick(v)).count() as u32;

    let multiple_person_count = count(|v| v.multiple_persons);
    let phone_detected_count = count(|v| v.phone_detected);
    let looking_away_count = count(|v| v.looking_away);
    let not_present_count = count(|v| v.not_present);

    let mut flags = Vec::new();
    if multiple_person_count >= MULTIPLE_PERSONS_THRESHOLD {
        flags.push(FLAG_EXTERNAL_ASSISTANCE.to_string());
    }
    if phone_detected_count >= PHONE_THRESHOLD {
        flags.push(FLAG_EXTERNAL_RESOURCES.to_string());
    }
    if looking_away_count >= LOOKING_AWAY_THRESHOLD {
        flags.push(FLAG_READING_MATERIAL.to_string());
    }

    let severity = match flags.len() {
        0 => Severity::None,
        1 => Severity::Medium,
        _ => Severity::High,
    };

    ProctoringSummary {
        total_screenshots: total,
        analyzed_count: verdicts.len(),
        failed_count: failed,
        multiple_person_count,
        phone_detected_count,
        looking_away_count,
        not_present_count,
        flags,
        severity,
    }
}

async fn classify_screenshot(
    screenshot: &Screenshot,
    llm: &dyn LanguageModel,
    blobs: &dyn BlobStore,
    deadline: Duration,
) -> Result<VisionVerdict, String> {
    let url = blobs
        .presigned_url(&screenshot.s3_key, PRESIGN_TTL)
        .await
        .map_err(|e| e.to_string())?;

    let request = CompletionRequest {
        system: VISION_SYSTEM.to_string(),
        messages: vec![ChatMessage::user_with_image(url, VISION_CLASSIFY_PROMPT)],
        max_tokens: 100,
        temperature: 0.0,
    };

    let raw = complete_within(llm, &request, deadline)
        .await
        .map_err(|e| e.to_string())?;
    parse_json_payload(&raw).map_err(|e| e.to_string())
}

/// Best-effort aggregate over an interview's screenshots (already ordered).
pub async fn analyze_integrity(
    screenshots: &[Screenshot],
    llm: &dyn LanguageModel,
    blobs: &dyn BlobStore,
    deadline: Duration,
) -> ProctoringSummary {
    let sample = sample_screenshots(screenshots);
    let mut verdicts = Vec::with_capacity(sample.len());
    let mut failed = 0;

    for screenshot in sample {
        match classify_screenshot(screenshot, llm, blobs, deadline).await {
            Ok(verdict) => verdicts.push(verdict),
            Err(e) => {
                warn!(
                    "Skipping screenshot {} (seq {}) in integrity analysis: {e}",
                    screenshot.id, screenshot.sequence_number
                );
                failed += 1;
            }
        }
    }

    let summary = summarize(screenshots.len(), &verdicts, failed);
    info!(
        "Integrity analysis: {} of {} sampled, {} failed, severity {:?}, flags {:?}",
        summary.analyzed_count,
        summary.total_screenshots,
        summary.failed_count,
        summary.severity,
        summary.flags
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::{ContentBlock, ImageSource, LlmError};
    use crate::test_support::{screenshot, MemoryBlobStore, ScriptedModel};
    use uuid::Uuid;

    fn verdict(multiple: bool, phone: bool, away: bool) -> VisionVerdict {
        VisionVerdict {
            multiple_persons: multiple,
            phone_detected: phone,
            looking_away: away,
            not_present: false,
        }
    }

    fn shots(n: i32) -> Vec<Screenshot> {
        let interview_id = Uuid::new_v4();
        (1..=n).map(|seq| screenshot(interview_id, seq)).collect()
    }

    fn image_url(request: &CompletionRequest) -> String {
        match &request.messages[0].content[0] {
            ContentBlock::Image {
                source: ImageSource::Url { url },
            } => url.clone(),
            other => panic!("expected image block, got {other:?}"),
        }
    }

    #[test]
    fn test_sample_caps_at_ten_with_even_stride() {
        let all = shots(35);
        let sample = sample_screenshots(&all);
        let seqs: Vec<i32> = sample.iter().map(|s| s.sequence_number).collect();
        assert_eq!(seqs, vec![1, 4, 7, 10, 13, 16, 19, 22, 25, 28]);
    }

    #[test]
    fn test_sample_of_twelve_takes_first_ten() {
        let all = shots(12);
        assert_eq!(sample_screenshots(&all).len(), 10);
    }

    #[test]
    fn test_sample_small_set_is_whole_set() {
        let all = shots(3);
        assert_eq!(sample_screenshots(&all).len(), 3);
        assert!(sample_screenshots(&[]).is_empty());
    }

    #[test]
    fn test_single_flag_is_medium() {
        let verdicts = vec![
            verdict(true, false, false),
            verdict(true, false, false),
            verdict(false, true, false),
        ];
        let summary = summarize(12, &verdicts, 0);
        assert_eq!(summary.multiple_person_count, 2);
        assert_eq!(summary.flags, vec![FLAG_EXTERNAL_ASSISTANCE.to_string()]);
        assert_eq!(summary.severity, Severity::Medium);
    }

    #[test]
    fn test_two_flags_are_high() {
        let verdicts = vec![
            verdict(true, true, false),
            verdict(true, true, false),
            verdict(false, false, false),
        ];
        let summary = summarize(12, &verdicts, 0);
        assert_eq!(summary.flags.len(), 2);
        assert_eq!(summary.severity, Severity::High);
    }

    #[test]
    fn test_looking_away_needs_three() {
        let two = vec![verdict(false, false, true); 2];
        assert_eq!(summarize(2, &two, 0).severity, Severity::None);

        let three = vec![verdict(false, false, true); 3];
        let summary = summarize(3, &three, 0);
        assert_eq!(summary.flags, vec![FLAG_READING_MATERIAL.to_string()]);
    }

    #[test]
    fn test_partial_verdict_defaults_missing_fields() {
        let v: VisionVerdict = serde_json::from_str(r#"{"phone_detected": true}"#).unwrap();
        assert_eq!(v, verdict(false, true, false));
    }

    #[tokio::test]
    async fn test_failures_are_skipped_not_fatal() {
        let all = shots(4);
        let blobs = MemoryBlobStore::default();
        // Second image errors, third answers prose; the other two see a phone.
        let model = ScriptedModel::new(|request| {
            let url = image_url(request);
            if url.contains("00002") {
                Err(LlmError::Api {
                    status: 500,
                    message: "overloaded".into(),
                })
            } else if url.contains("00003") {
                Ok("I think the candidate looks fine.".to_string())
            } else {
                Ok(r#"{"multiple_persons": false, "phone_detected": true, "looking_away": false, "not_present": false}"#.to_string())
            }
        });

        let summary = analyze_integrity(&all, &model, &blobs, Duration::from_secs(5)).await;
        assert_eq!(summary.total_screenshots, 4);
        assert_eq!(summary.analyzed_count, 2);
        assert_eq!(summary.failed_count, 2);
        assert_eq!(summary.phone_detected_count, 2);
        assert_eq!(summary.severity, Severity::Medium);
        assert_eq!(model.calls(), 4);
    }

    #[tokio::test]
    async fn test_no_screenshots_means_no_model_calls() {
        let model = ScriptedModel::new(|_| panic!("vision model must not be called"));
        let summary =
            analyze_integrity(&[], &model, &MemoryBlobStore::default(), Duration::from_secs(5))
                .await;
        assert_eq!(summary, ProctoringSummary::default());
    }
}
