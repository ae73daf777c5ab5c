// Proctoring: per-upload face classification (face.rs, ingest.rs) and the
// evaluation-time integrity aggregate (integrity.rs).

pub mod face;
pub mod handlers;
pub mod ingest;
pub mod integrity;
pub mod prompts;
