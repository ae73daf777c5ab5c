// Conversation engine: stateless interviewer turns rebuilt from the turn log.
// prompts.rs holds the interviewer prompt text; history.rs, shaping.rs and
// resume.rs are the pure pieces engine.rs assembles per request.

pub mod engine;
pub mod handlers;
pub mod history;
pub mod prompts;
pub mod resume;
pub mod shaping;
