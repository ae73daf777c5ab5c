//! Post-processing of the interviewer's raw reply: completion detection and
//! a hard cap on reply length.

use crate::conversation::prompts::COMPLETION_SENTINEL;

pub const MAX_SENTENCES: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapedReply {
    pub text: String,
    /// The model signalled the natural end of the interview.
    pub is_complete: bool,
}

/// Strips every sentinel occurrence, then caps the reply at `MAX_SENTENCES`.
pub fn shape_reply(raw: &str) -> ShapedReply {
    let is_complete = raw.contains(COMPLETION_SENTINEL);
    let cleaned = raw.replace(COMPLETION_SENTINEL, "");
    ShapedReply {
        text: limit_sentences(cleaned.trim(), MAX_SENTENCES),
        is_complete,
    }
}

/// Replies within the limit pass through untouched. Longer ones are split on
/// `.`, `!` and `?` and the first `max` sentences are rejoined with periods.
pub fn limit_sentences(text: &str, max: usize) -> String {
    let sentences: Vec<&str> = text
        .split(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    if sentences.len() <= max {
        return text.to_string();
    }
    format!("{}.", sentences[..max].join(". "))
}
