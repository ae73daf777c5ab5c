//! Rebuilds a model-ready message history from the persisted turn log.
//!
//! The Messages API requires the first entry to be a user message and roles to
//! alternate. Stored dialogue opens with the AI greeting, so the start
//! instruction is replayed in front of it, and consecutive same-role turns
//! (duplicated upstream writes) are merged with a newline.

use crate::llm_client::{ChatMessage, ChatRole};
use crate::models::conversation::{ConversationTurn, Speaker};

fn role_of(speaker: Speaker) -> ChatRole {
    match speaker {
        Speaker::Ai => ChatRole::Assistant,
        Speaker::Candidate => ChatRole::User,
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct History {
    entries: Vec<(ChatRole, String)>,
}

impl History {
    /// Turns are ordered by timestamp here; callers need not pre-sort.
    pub fn from_turns(turns: &[ConversationTurn], start_instruction: &str) -> Self {
        let mut ordered: Vec<&ConversationTurn> = turns.iter().collect();
        ordered.sort_by_key(|t| t.timestamp);

        let mut history = History::default();
        if ordered.first().map(|t| t.speaker) == Some(Speaker::Ai) {
            history.push(ChatRole::User, start_instruction);
        }
        for turn in ordered {
            history.push(role_of(turn.speaker), &turn.message);
        }
        history
    }

    /// Appends, merging into the previous entry when the role repeats.
    pub fn push(&mut self, role: ChatRole, text: &str) {
        match self.entries.last_mut() {
            Some((last_role, last_text)) if *last_role == role => {
                last_text.push('\n');
                last_text.push_str(text);
            }
            _ => self.entries.push((role, text.to_string())),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_messages(self) -> Vec<ChatMessage> {
        self.entries
            .into_iter()
            .map(|(role, text)| ChatMessage::text(role, text))
            .collect()
    }
}
