// Evaluation: rubric scoring of the transcript, fused with the proctoring
// integrity summary into exactly one result per interview.
// rubric.rs and fusion.rs are pure; generator.rs orchestrates and persists.

pub mod fusion;
pub mod generator;
pub mod handlers;
pub mod prompts;
pub mod rubric;

pub use generator::{generate, spawn_generation};
