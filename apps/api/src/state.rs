use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::LanguageModel;
use crate::notifications::Notifier;
use crate::proctoring::face::FaceDetector;
use crate::storage::BlobStore;
use crate::store::Store;
use crate::turn_lock::TurnLock;

/// Shared application state injected into all route handlers via Axum extractors.
///
/// Every collaborator sits behind a trait object: production wires Postgres,
/// Anthropic, the face sidecar, S3 and Redis; tests wire in-memory doubles.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub llm: Arc<dyn LanguageModel>,
    pub face_detector: Arc<dyn FaceDetector>,
    pub blobs: Arc<dyn BlobStore>,
    pub turn_lock: Arc<dyn TurnLock>,
    pub notifier: Arc<dyn Notifier>,
    pub config: Config,
}
