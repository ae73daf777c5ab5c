// Shared prompt fragments.
// Each engine that needs LLM calls defines its own prompts.rs alongside it.

/// Instruction appended to every judgement prompt so the model grounds its answer
/// in the material it was actually given.
pub const EVIDENCE_INSTRUCTION: &str = "\
    CRITICAL: Base every judgement ONLY on the material provided above. \
    Do NOT give generic answers that would fit any candidate. \
    If the material does not support a claim, leave it out.";
