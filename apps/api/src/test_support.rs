//! In-memory doubles for every port in `AppState`, plus record fixtures.
//! Compiled for tests only.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::config::Config;
use crate::errors::AppError;
use crate::llm_client::{CompletionRequest, LanguageModel, LlmError};
use crate::models::conversation::{ConversationTurn, Speaker};
use crate::models::evaluation::EvaluationResult;
use crate::models::interview::{
    AgentPersona, CandidateFacts, Interview, InterviewContext, InterviewModality, InterviewStatus,
    JobFacts,
};
use crate::models::screenshot::{IssueType, Screenshot};
use crate::models::session::{InterviewSession, SessionStatus};
use crate::notifications::{InterviewEvent, Notifier};
use crate::proctoring::face::{DetectorError, FaceDetection, FaceDetector};
use crate::state::AppState;
use crate::storage::BlobStore;
use crate::store::{
    ConversationStore, InsertOutcome, InterviewRepository, NewScreenshot, ProctoringRepository,
    ResultRepository,
};
use crate::turn_lock::{TurnLease, TurnLock};

// ────────────────────────────────────────────────────────────────────────────
// Fixtures
// ────────────────────────────────────────────────────────────────────────────

pub fn interview(status: InterviewStatus) -> Interview {
    let now = Utc::now();
    let started = (status != InterviewStatus::Scheduled).then_some(now);
    Interview {
        id: Uuid::new_v4(),
        job_id: Uuid::new_v4(),
        candidate_id: Uuid::new_v4(),
        agent_id: Some(Uuid::new_v4()),
        scheduled_at: now,
        duration_minutes: 30,
        status,
        modality: InterviewModality::Voice,
        started_at: started,
        completed_at: (status == InterviewStatus::Completed).then_some(now),
        cancelled_at: None,
        cancelled_by: None,
        cancellation_reason: None,
        created_at: now,
        updated_at: now,
    }
}

pub fn session(status: SessionStatus) -> InterviewSession {
    let now = Utc::now();
    let started = matches!(
        status,
        SessionStatus::Active | SessionStatus::Paused | SessionStatus::Completed
    )
    .then_some(now);
    InterviewSession {
        id: Uuid::new_v4(),
        interview_id: Uuid::new_v4(),
        session_number: 1,
        status,
        is_primary: true,
        url_opened_at: Some(now),
        started_at: started,
        ended_at: None,
        actual_duration_minutes: None,
        last_activity_at: None,
        network_interruptions: 0,
        questions_answered: 0,
        completion_percentage: 0,
        session_quality_score: None,
        audio_quality: None,
        video_quality: None,
        device_info: None,
        created_at: now,
        updated_at: now,
    }
}

pub fn candidate() -> CandidateFacts {
    CandidateFacts {
        id: Uuid::new_v4(),
        full_name: "Ada Lovelace".to_string(),
        experience_years: Some(7.0),
        current_company: Some("Analytical Engines Ltd".to_string()),
        resume_summary: Some(
            "Systems engineer with seven years of Rust and distributed storage work.".to_string(),
        ),
        resume_s3_key: None,
    }
}

/// Two job questions and one persona question.
pub fn context(status: InterviewStatus) -> InterviewContext {
    let interview = interview(status);
    InterviewContext {
        job: JobFacts {
            title: "Backend Engineer".to_string(),
            experience_level: "senior".to_string(),
            skills_required: vec!["Rust".to_string(), "PostgreSQL".to_string()],
        },
        candidate: CandidateFacts {
            id: interview.candidate_id,
            ..candidate()
        },
        agent: interview.agent_id.map(|id| AgentPersona {
            id,
            name: "Sam".to_string(),
            system_prompt: "Calm and curious, asks for concrete examples".to_string(),
            interview_type: "technical".to_string(),
        }),
        job_questions: vec![
            "Describe a production incident you led.".to_string(),
            "How do you design a schema migration with zero downtime?".to_string(),
        ],
        agent_questions: vec!["What are you learning right now?".to_string()],
        interview,
    }
}

pub fn screenshot(interview_id: Uuid, sequence_number: i32) -> Screenshot {
    Screenshot {
        id: Uuid::new_v4(),
        interview_id,
        session_id: None,
        sequence_number,
        s3_key: format!("shots/{sequence_number:05}.jpg"),
        face_count: 1,
        multiple_people_detected: false,
        issue_type: IssueType::None,
        confidence: 0.9,
        metadata: json!({}),
        captured_at: Utc::now(),
    }
}

pub fn png_bytes(width: u32, height: u32) -> Bytes {
    let mut buf = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(image::RgbImage::new(width, height))
        .write_to(&mut buf, image::ImageFormat::Png)
        .expect("encode test png");
    Bytes::from(buf.into_inner())
}

/// A well-formed rubric answer with no red flags.
pub fn rubric_json(overall: f64, recommendation: &str) -> String {
    json!({
        "overall_score": overall,
        "technical_score": 7.0,
        "communication_score": 7.5,
        "cultural_fit_score": 7.0,
        "behavioral_score": 6.5,
        "strengths": ["Concrete examples from past work"],
        "weaknesses": ["Light on testing strategy"],
        "red_flags": [],
        "recommendation": recommendation,
        "interview_quality": 7,
        "technical_depth": 6,
        "behavioral_analysis": {"confidence_level": "high", "engagement": "medium", "clarity": "high"},
        "skill_assessment": {"relevant_skills_demonstrated": ["Rust"], "missing_skills": []},
        "ai_feedback": {"summary": "Solid candidate.", "hiring_justification": "Clear answers."}
    })
    .to_string()
}

pub fn test_config() -> Config {
    Config {
        database_url: "postgres://localhost/test".to_string(),
        redis_url: "redis://localhost".to_string(),
        s3_bucket: "test-bucket".to_string(),
        s3_endpoint: "http://localhost:9000".to_string(),
        aws_access_key_id: "test".to_string(),
        aws_secret_access_key: "test".to_string(),
        anthropic_api_key: "test".to_string(),
        face_detector_url: "http://localhost:7070".to_string(),
        port: 0,
        rust_log: "debug".to_string(),
        llm_timeout: Duration::from_secs(5),
        face_detector_timeout: Duration::from_secs(5),
        turn_lock_ttl: Duration::from_secs(30),
        event_queue: "test_events".to_string(),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Store
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Tables {
    contexts: HashMap<Uuid, InterviewContext>,
    turns: Vec<ConversationTurn>,
    sessions: Vec<InterviewSession>,
    screenshots: Vec<Screenshot>,
    results: HashMap<Uuid, EvaluationResult>,
    /// Stored on the next insert as if another writer had won the race.
    racing_result: Option<EvaluationResult>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn seed_context(&self, ctx: InterviewContext) {
        self.tables
            .lock()
            .unwrap()
            .contexts
            .insert(ctx.interview.id, ctx);
    }

    pub fn interview(&self, id: Uuid) -> Interview {
        self.tables.lock().unwrap().contexts[&id].interview.clone()
    }

    /// Overwrites the status as a concurrent writer would.
    pub fn set_status(&self, id: Uuid, status: InterviewStatus) {
        if let Some(ctx) = self.tables.lock().unwrap().contexts.get_mut(&id) {
            ctx.interview.status = status;
        }
    }

    pub fn turns(&self, interview_id: Uuid) -> Vec<ConversationTurn> {
        let tables = self.tables.lock().unwrap();
        let mut turns: Vec<_> = tables
            .turns
            .iter()
            .filter(|t| t.interview_id == interview_id)
            .cloned()
            .collect();
        turns.sort_by_key(|t| t.timestamp);
        turns
    }

    pub fn screenshots(&self, interview_id: Uuid) -> Vec<Screenshot> {
        let tables = self.tables.lock().unwrap();
        let mut shots: Vec<_> = tables
            .screenshots
            .iter()
            .filter(|s| s.interview_id == interview_id)
            .cloned()
            .collect();
        shots.sort_by_key(|s| (s.sequence_number, s.captured_at));
        shots
    }

    pub fn result(&self, interview_id: Uuid) -> Option<EvaluationResult> {
        self.tables.lock().unwrap().results.get(&interview_id).cloned()
    }

    pub fn push_screenshot(&self, screenshot: Screenshot) {
        self.tables.lock().unwrap().screenshots.push(screenshot);
    }

    pub fn race_result(&self, result: EvaluationResult) {
        self.tables.lock().unwrap().racing_result = Some(result);
    }

    fn next_timestamp(tables: &Tables, interview_id: Uuid) -> DateTime<Utc> {
        let now = Utc::now();
        tables
            .turns
            .iter()
            .filter(|t| t.interview_id == interview_id)
            .map(|t| t.timestamp + chrono::Duration::microseconds(1))
            .max()
            .map_or(now, |floor| floor.max(now))
    }
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn append_turn(
        &self,
        interview_id: Uuid,
        speaker: Speaker,
        message: &str,
    ) -> Result<ConversationTurn> {
        let mut tables = self.tables.lock().unwrap();
        let turn = ConversationTurn {
            id: Uuid::new_v4(),
            interview_id,
            speaker,
            message: message.to_string(),
            timestamp: Self::next_timestamp(&tables, interview_id),
        };
        tables.turns.push(turn.clone());
        Ok(turn)
    }

    async fn list_turns(&self, interview_id: Uuid) -> Result<Vec<ConversationTurn>> {
        Ok(self.turns(interview_id))
    }
}

#[async_trait]
impl InterviewRepository for MemoryStore {
    async fn find_interview(&self, interview_id: Uuid) -> Result<Option<Interview>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .contexts
            .get(&interview_id)
            .map(|ctx| ctx.interview.clone()))
    }

    async fn load_context(&self, interview_id: Uuid) -> Result<Option<InterviewContext>> {
        Ok(self.tables.lock().unwrap().contexts.get(&interview_id).cloned())
    }

    async fn save_interview_transition(
        &self,
        interview: &Interview,
        expected: InterviewStatus,
    ) -> Result<bool> {
        let mut tables = self.tables.lock().unwrap();
        match tables.contexts.get_mut(&interview.id) {
            Some(ctx) if ctx.interview.status == expected => {
                ctx.interview = interview.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn open_session(
        &self,
        interview_id: Uuid,
        device_info: Option<&str>,
    ) -> Result<InterviewSession> {
        let mut tables = self.tables.lock().unwrap();
        let previous: Vec<i32> = tables
            .sessions
            .iter()
            .filter(|s| s.interview_id == interview_id)
            .map(|s| s.session_number)
            .collect();
        let opened = InterviewSession {
            interview_id,
            session_number: previous.iter().max().copied().unwrap_or(0) + 1,
            is_primary: previous.is_empty(),
            device_info: device_info.map(str::to_string),
            ..session(SessionStatus::Waiting)
        };
        tables.sessions.push(opened.clone());
        Ok(opened)
    }

    async fn find_session(&self, session_id: Uuid) -> Result<Option<InterviewSession>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.sessions.iter().find(|s| s.id == session_id).cloned())
    }

    async fn list_sessions(&self, interview_id: Uuid) -> Result<Vec<InterviewSession>> {
        let tables = self.tables.lock().unwrap();
        let mut sessions: Vec<_> = tables
            .sessions
            .iter()
            .filter(|s| s.interview_id == interview_id)
            .cloned()
            .collect();
        sessions.sort_by_key(|s| s.session_number);
        Ok(sessions)
    }

    async fn save_session_transition(
        &self,
        session: &InterviewSession,
        expected: SessionStatus,
    ) -> Result<bool> {
        let mut tables = self.tables.lock().unwrap();
        match tables.sessions.iter_mut().find(|s| s.id == session.id) {
            Some(stored) if stored.status == expected => {
                *stored = session.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl ProctoringRepository for MemoryStore {
    async fn insert_screenshot(&self, new: NewScreenshot) -> Result<Screenshot> {
        let stored = Screenshot {
            id: Uuid::new_v4(),
            interview_id: new.interview_id,
            session_id: new.session_id,
            sequence_number: new.sequence_number,
            s3_key: new.s3_key,
            face_count: new.face_count,
            multiple_people_detected: new.multiple_people_detected,
            issue_type: new.issue_type,
            confidence: new.confidence,
            metadata: new.metadata,
            captured_at: Utc::now(),
        };
        self.push_screenshot(stored.clone());
        Ok(stored)
    }

    async fn list_screenshots(&self, interview_id: Uuid) -> Result<Vec<Screenshot>> {
        Ok(self.screenshots(interview_id))
    }
}

#[async_trait]
impl ResultRepository for MemoryStore {
    async fn find_result(&self, interview_id: Uuid) -> Result<Option<EvaluationResult>> {
        Ok(self.result(interview_id))
    }

    async fn insert_result(&self, result: &EvaluationResult) -> Result<InsertOutcome> {
        let mut tables = self.tables.lock().unwrap();
        if let Some(winner) = tables.racing_result.take() {
            tables.results.insert(winner.interview_id, winner);
        }
        match tables.results.get(&result.interview_id) {
            Some(existing) => Ok(InsertOutcome::Existing(existing.clone())),
            None => {
                tables.results.insert(result.interview_id, result.clone());
                Ok(InsertOutcome::Inserted(result.clone()))
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Model, detector, blobs, lock, notifier
// ────────────────────────────────────────────────────────────────────────────

type Responder = Box<dyn Fn(&CompletionRequest) -> Result<String, LlmError> + Send + Sync>;

/// Answers every request with a swappable closure and records what it was asked.
pub struct ScriptedModel {
    responder: Mutex<Responder>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedModel {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&CompletionRequest) -> Result<String, LlmError> + Send + Sync + 'static,
    {
        Self {
            responder: Mutex::new(Box::new(responder)),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn respond<F>(&self, responder: F)
    where
        F: Fn(&CompletionRequest) -> Result<String, LlmError> + Send + Sync + 'static,
    {
        *self.responder.lock().unwrap() = Box::new(responder);
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> CompletionRequest {
        self.requests
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("model was never called")
    }
}

impl Default for ScriptedModel {
    fn default() -> Self {
        Self::new(|_| {
            Err(LlmError::Api {
                status: 500,
                message: "no scripted response".to_string(),
            })
        })
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        let responder = self.responder.lock().unwrap();
        (*responder)(request)
    }
}

/// Returns a fixed detection list, or a fixed outage.
pub struct StaticFaceDetector {
    outcome: Mutex<Result<Vec<FaceDetection>, String>>,
}

impl Default for StaticFaceDetector {
    fn default() -> Self {
        Self {
            outcome: Mutex::new(Ok(vec![FaceDetection { score: 0.9 }])),
        }
    }
}

impl StaticFaceDetector {
    pub fn set(&self, outcome: Result<Vec<FaceDetection>, String>) {
        *self.outcome.lock().unwrap() = outcome;
    }
}

#[async_trait]
impl FaceDetector for StaticFaceDetector {
    async fn detect(
        &self,
        _image: Bytes,
        _content_type: &str,
    ) -> Result<Vec<FaceDetection>, DetectorError> {
        self.outcome
            .lock()
            .unwrap()
            .clone()
            .map_err(|body| DetectorError::Status { status: 503, body })
    }
}

#[derive(Default)]
pub struct MemoryBlobStore {
    objects: Mutex<HashMap<String, Bytes>>,
}

impl MemoryBlobStore {
    pub fn insert(&self, key: &str, body: Bytes) {
        self.objects.lock().unwrap().insert(key.to_string(), body);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains_key(key)
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, key: &str, body: Bytes, _content_type: &str) -> Result<(), AppError> {
        self.insert(key, body);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Bytes, AppError> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| AppError::Storage(format!("no object at {key}")))
    }

    async fn presigned_url(&self, key: &str, _ttl: Duration) -> Result<String, AppError> {
        Ok(format!("memory://{key}"))
    }
}

/// Process-local lock that refuses a held turn immediately.
#[derive(Default)]
pub struct LocalTurnLock {
    held: Mutex<HashMap<Uuid, String>>,
}

#[async_trait]
impl TurnLock for LocalTurnLock {
    async fn acquire(&self, interview_id: Uuid) -> Result<TurnLease, AppError> {
        let mut held = self.held.lock().unwrap();
        if held.contains_key(&interview_id) {
            return Err(AppError::TurnInProgress(interview_id));
        }
        let lease = TurnLease::new(interview_id);
        held.insert(interview_id, lease.token().to_string());
        Ok(lease)
    }

    async fn release(&self, lease: TurnLease) {
        let mut held = self.held.lock().unwrap();
        if held.get(&lease.interview_id).map(String::as_str) == Some(lease.token()) {
            held.remove(&lease.interview_id);
        }
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<InterviewEvent>>,
}

impl RecordingNotifier {
    pub fn events(&self) -> Vec<InterviewEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Polls until a matching event was published; panics after two seconds.
    pub async fn wait_for(&self, matches: impl Fn(&InterviewEvent) -> bool) -> InterviewEvent {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        loop {
            if let Some(event) = self.events().into_iter().find(|e| matches(e)) {
                return event;
            }
            if tokio::time::Instant::now() >= deadline {
                panic!("event never published; saw {:?}", self.events());
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn publish(&self, event: &InterviewEvent) -> Result<()> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Harness
// ────────────────────────────────────────────────────────────────────────────

/// An `AppState` wired to in-memory doubles, with handles to inspect them.
pub struct TestHarness {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub model: Arc<ScriptedModel>,
    pub faces: Arc<StaticFaceDetector>,
    pub blobs: Arc<MemoryBlobStore>,
    pub notifier: Arc<RecordingNotifier>,
}

impl TestHarness {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::default());
        let model = Arc::new(ScriptedModel::default());
        let faces = Arc::new(StaticFaceDetector::default());
        let blobs = Arc::new(MemoryBlobStore::default());
        let notifier = Arc::new(RecordingNotifier::default());

        let state = AppState {
            store: store.clone(),
            llm: model.clone(),
            face_detector: faces.clone(),
            blobs: blobs.clone(),
            turn_lock: Arc::new(LocalTurnLock::default()),
            notifier: notifier.clone(),
            config: test_config(),
        };

        Self {
            state,
            store,
            model,
            faces,
            blobs,
            notifier,
        }
    }

    /// Stores a fresh interview (with job, candidate and persona) in `status`.
    pub fn seed_interview(&self, status: InterviewStatus) -> Interview {
        let ctx = context(status);
        let interview = ctx.interview.clone();
        self.store.seed_context(ctx);
        interview
    }

    /// Appends turns in order, as the engine would have.
    pub fn seed_turns(&self, interview_id: Uuid, turns: &[(Speaker, &str)]) {
        let mut tables = self.store.tables.lock().unwrap();
        for (speaker, message) in turns {
            let turn = ConversationTurn {
                id: Uuid::new_v4(),
                interview_id,
                speaker: *speaker,
                message: message.to_string(),
                timestamp: MemoryStore::next_timestamp(&tables, interview_id),
            };
            tables.turns.push(turn);
        }
    }

    /// Screenshots with sequence numbers `1..=count`.
    pub fn seed_screenshots(&self, interview_id: Uuid, count: i32) {
        for seq in 1..=count {
            self.store.push_screenshot(screenshot(interview_id, seq));
        }
    }
}
