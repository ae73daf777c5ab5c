pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::conversation::handlers as conversation;
use crate::evaluation::handlers as evaluation;
use crate::lifecycle::handlers as lifecycle;
use crate::proctoring::handlers as proctoring;
use crate::state::AppState;

/// Upper bound for a single screenshot upload.
const MAX_SCREENSHOT_BYTES: usize = 10 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Conversation API
        .route("/api/v1/conversation/start", post(conversation::handle_start))
        .route(
            "/api/v1/conversation/message",
            post(conversation::handle_message),
        )
        .route("/api/v1/conversation/end", post(conversation::handle_end))
        .route(
            "/api/v1/interviews/:id/transcript",
            get(conversation::handle_transcript),
        )
        // Lifecycle API
        .route(
            "/api/v1/interviews/:id/cancel",
            post(lifecycle::handle_cancel_interview),
        )
        .route(
            "/api/v1/interviews/:id/sessions",
            post(lifecycle::handle_open_session).get(lifecycle::handle_list_sessions),
        )
        .route(
            "/api/v1/sessions/:id/start",
            post(lifecycle::handle_start_session),
        )
        .route(
            "/api/v1/sessions/:id/pause",
            post(lifecycle::handle_pause_session),
        )
        .route(
            "/api/v1/sessions/:id/heartbeat",
            post(lifecycle::handle_session_heartbeat),
        )
        .route("/api/v1/sessions/:id/end", post(lifecycle::handle_end_session))
        // Proctoring API
        .route(
            "/api/v1/screenshots",
            post(proctoring::handle_upload_screenshot)
                .layer(DefaultBodyLimit::max(MAX_SCREENSHOT_BYTES)),
        )
        // Evaluation API
        .route(
            "/api/v1/interviews/:id/result",
            get(evaluation::handle_get_result).post(evaluation::handle_generate_result),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::models::conversation::Speaker;
    use crate::models::interview::InterviewStatus;
    use crate::test_support::{png_bytes, rubric_json, TestHarness};

    async fn call(harness: &TestHarness, request: Request<Body>) -> (StatusCode, Value) {
        let response = build_router(harness.state.clone())
            .oneshot(request)
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let harness = TestHarness::new();
        let (status, body) = call(&harness, get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_start_returns_camel_case_reply() {
        let harness = TestHarness::new();
        let iv = harness.seed_interview(InterviewStatus::Scheduled);
        harness.model.respond(|_| Ok("Hello Ada! How are you today?".into()));

        let (status, body) = call(
            &harness,
            post_json("/api/v1/conversation/start", json!({"interviewId": iv.id})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Hello Ada! How are you today?");
        assert_eq!(body["questionNumber"], 1);
        assert_eq!(body["isComplete"], false);
        assert!(body["totalQuestions"].as_u64().unwrap() > 0);
    }

    #[tokio::test]
    async fn test_message_without_text_is_bad_request() {
        let harness = TestHarness::new();
        let iv = harness.seed_interview(InterviewStatus::InProgress);
        let (status, body) = call(
            &harness,
            post_json("/api/v1/conversation/message", json!({"interviewId": iv.id})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_message_to_scheduled_interview_is_conflict() {
        let harness = TestHarness::new();
        let iv = harness.seed_interview(InterviewStatus::Scheduled);
        let (status, body) = call(
            &harness,
            post_json(
                "/api/v1/conversation/message",
                json!({"interviewId": iv.id, "message": "hi"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "INVALID_STATE_TRANSITION");
    }

    #[tokio::test]
    async fn test_unknown_interview_is_not_found() {
        let harness = TestHarness::new();
        let (status, _) = call(
            &harness,
            get(&format!("/api/v1/interviews/{}/transcript", Uuid::new_v4())),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_end_then_fetch_result() {
        let harness = TestHarness::new();
        let iv = harness.seed_interview(InterviewStatus::InProgress);
        harness.seed_turns(
            iv.id,
            &[(Speaker::Ai, "Hello!"), (Speaker::Candidate, "Hi, glad to be here.")],
        );
        harness.model.respond(|_| Ok(rubric_json(7.0, "hire")));

        let (status, ended) = call(
            &harness,
            post_json("/api/v1/conversation/end", json!({"interviewId": iv.id})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ended["status"], "completed");
        assert_eq!(ended["overallScore"], 7.0);
        assert_eq!(ended["recommendation"], "hire");
        assert!(ended.get("evaluationError").is_none());

        let (status, result) = call(
            &harness,
            get(&format!("/api/v1/interviews/{}/result", iv.id)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(result["id"], ended["resultId"]);

        let (status, transcript) = call(
            &harness,
            get(&format!("/api/v1/interviews/{}/transcript", iv.id)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(transcript.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_result_missing_is_not_found() {
        let harness = TestHarness::new();
        let iv = harness.seed_interview(InterviewStatus::Completed);
        let (status, _) = call(
            &harness,
            get(&format!("/api/v1/interviews/{}/result", iv.id)),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_cancel_requires_reason() {
        let harness = TestHarness::new();
        let iv = harness.seed_interview(InterviewStatus::Scheduled);
        let (status, _) = call(
            &harness,
            post_json(
                &format!("/api/v1/interviews/{}/cancel", iv.id),
                json!({"reason": "  "}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = call(
            &harness,
            post_json(
                &format!("/api/v1/interviews/{}/cancel", iv.id),
                json!({"reason": "Candidate withdrew"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "cancelled");
    }

    #[tokio::test]
    async fn test_session_lifecycle_over_http() {
        let harness = TestHarness::new();
        let iv = harness.seed_interview(InterviewStatus::Scheduled);

        let (status, session) = call(
            &harness,
            post_json(
                &format!("/api/v1/interviews/{}/sessions", iv.id),
                json!({"deviceInfo": "Firefox on Linux"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let session_id = session["id"].as_str().unwrap().to_string();

        let (status, started) = call(
            &harness,
            post_json(&format!("/api/v1/sessions/{session_id}/start"), json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(started["status"], "active");

        let (status, _) = call(
            &harness,
            post_json(
                &format!("/api/v1/sessions/{session_id}/heartbeat"),
                json!({"completionPercentage": 140}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, listed) = call(
            &harness,
            get(&format!("/api/v1/interviews/{}/sessions", iv.id)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed.as_array().unwrap().len(), 1);
    }

    fn multipart(interview_id: Uuid, image: &[u8]) -> Request<Body> {
        let boundary = "screenshot-boundary";
        let mut body = Vec::new();
        for (name, value) in [
            ("interviewId", interview_id.to_string()),
            ("sequenceNumber", "3".to_string()),
        ] {
            body.extend_from_slice(
                format!(
                    "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"shot.png\"\r\nContent-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(image);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        Request::post("/api/v1/screenshots")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_screenshot_upload_classifies() {
        let harness = TestHarness::new();
        let iv = harness.seed_interview(InterviewStatus::InProgress);
        harness.faces.set(Ok(vec![]));

        let (status, body) = call(&harness, multipart(iv.id, &png_bytes(4, 3))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["sequenceNumber"], 3);
        assert_eq!(body["faceCount"], 0);
        assert_eq!(body["issueType"], "no_face");
        assert_eq!(body["analyzed"], true);
        assert_eq!(harness.store.screenshots(iv.id).len(), 1);
    }

    #[tokio::test]
    async fn test_screenshot_garbage_payload_is_rejected() {
        let harness = TestHarness::new();
        let iv = harness.seed_interview(InterviewStatus::InProgress);
        let (status, _) = call(&harness, multipart(iv.id, b"definitely not an image")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(harness.store.screenshots(iv.id).is_empty());
    }
}
