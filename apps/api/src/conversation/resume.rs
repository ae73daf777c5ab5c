//! Resume text for the interviewer prompt.
//!
//! A stored summary wins. Otherwise the resume PDF is pulled from object storage
//! and text-extracted on a blocking thread. Either way the result is whitespace
//! collapsed and truncated so the system prompt stays bounded.

use tracing::{debug, warn};

use crate::models::interview::CandidateFacts;
use crate::storage::BlobStore;

pub const MAX_RESUME_CHARS: usize = 1500;
pub const NO_RESUME: &str = "No resume uploaded";
pub const RESUME_UNAVAILABLE: &str = "Resume not available";

/// Collapses runs of whitespace and truncates on a char boundary.
pub fn condense(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    match collapsed.char_indices().nth(MAX_RESUME_CHARS) {
        Some((cut, _)) => format!("{}…", &collapsed[..cut]),
        None => collapsed,
    }
}

pub async fn resume_summary(candidate: &CandidateFacts, blobs: &dyn BlobStore) -> String {
    if let Some(summary) = candidate
        .resume_summary
        .as_deref()
        .filter(|s| !s.trim().is_empty())
    {
        return condense(summary);
    }

    let Some(key) = candidate.resume_s3_key.as_deref() else {
        return NO_RESUME.to_string();
    };

    let pdf = match blobs.get(key).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Resume {key} for candidate {} not fetched: {e}", candidate.id);
            return RESUME_UNAVAILABLE.to_string();
        }
    };

    // CPU-bound parse, kept off the async executor.
    let extracted =
        tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&pdf)).await;

    match extracted {
        Ok(Ok(text)) if !text.trim().is_empty() => {
            debug!("Extracted {} chars from resume {key}", text.len());
            condense(&text)
        }
        Ok(Ok(_)) => {
            warn!("Resume {key} contains no extractable text");
            RESUME_UNAVAILABLE.to_string()
        }
        Ok(Err(e)) => {
            warn!("Resume {key} could not be parsed: {e}");
            RESUME_UNAVAILABLE.to_string()
        }
        Err(e) => {
            warn!("Resume extraction task failed for {key}: {e}");
            RESUME_UNAVAILABLE.to_string()
        }
    }
}
