//! Outbound lifecycle events for side systems (email, recruiter dashboards).
//!
//! Events go onto a Redis list consumed elsewhere. Dispatch is fire-and-forget:
//! a failed publish is logged and never rolls back the transition that caused it.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::evaluation::Recommendation;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum InterviewEvent {
    InterviewStarted {
        interview_id: Uuid,
    },
    InterviewCompleted {
        interview_id: Uuid,
    },
    InterviewCancelled {
        interview_id: Uuid,
        reason: String,
    },
    EvaluationGenerated {
        interview_id: Uuid,
        result_id: Uuid,
        overall_score: f64,
        recommendation: Recommendation,
    },
}

#[derive(Serialize)]
struct Envelope<'a> {
    #[serde(flatten)]
    event: &'a InterviewEvent,
    occurred_at: DateTime<Utc>,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn publish(&self, event: &InterviewEvent) -> Result<()>;
}

/// Publishes on a background task and returns immediately.
pub fn dispatch(notifier: Arc<dyn Notifier>, event: InterviewEvent) {
    tokio::spawn(async move {
        if let Err(e) = notifier.publish(&event).await {
            warn!("Dropping {event:?}: {e:#}");
        }
    });
}

pub struct RedisNotifier {
    client: redis::Client,
    queue: String,
}

impl RedisNotifier {
    pub fn new(client: redis::Client, queue: String) -> Self {
        Self { client, queue }
    }
}

#[async_trait]
impl Notifier for RedisNotifier {
    async fn publish(&self, event: &InterviewEvent) -> Result<()> {
        let payload = serde_json::to_string(&Envelope {
            event,
            occurred_at: Utc::now(),
        })?;

        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .context("Redis connection failed")?;

        let depth: i64 = redis::cmd("LPUSH")
            .arg(&self.queue)
            .arg(&payload)
            .query_async(&mut conn)
            .await
            .with_context(|| format!("LPUSH to {} failed", self.queue))?;

        debug!("Queued event on {} (depth {depth}): {payload}", self.queue);
        Ok(())
    }
}
