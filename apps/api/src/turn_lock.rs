//! Per-interview exclusion for conversational turns.
//!
//! Two concurrent submissions for one interview would otherwise interleave their
//! candidate/AI pairs. The Redis lease expires on its own if a holder dies mid-turn.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::AppError;

/// How long `acquire` keeps retrying before reporting the turn as busy.
const ACQUIRE_WAIT: Duration = Duration::from_secs(2);
const ACQUIRE_POLL: Duration = Duration::from_millis(100);

/// Compare-and-delete: only the holder's token may release the key.
const RELEASE_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
else
    return 0
end
"#;

/// Proof of holding an interview's turn. Hand it back to `TurnLock::release`.
#[derive(Debug)]
pub struct TurnLease {
    pub interview_id: Uuid,
    token: String,
}

impl TurnLease {
    pub fn new(interview_id: Uuid) -> Self {
        Self {
            interview_id,
            token: Uuid::new_v4().to_string(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

#[async_trait]
pub trait TurnLock: Send + Sync {
    /// Fails with `AppError::TurnInProgress` if the turn stays held past a short wait.
    async fn acquire(&self, interview_id: Uuid) -> Result<TurnLease, AppError>;

    /// Best effort. A lease that cannot be released simply expires.
    async fn release(&self, lease: TurnLease);
}

pub struct RedisTurnLock {
    client: redis::Client,
    ttl: Duration,
}

impl RedisTurnLock {
    pub fn new(client: redis::Client, ttl: Duration) -> Self {
        Self { client, ttl }
    }

    fn key(interview_id: Uuid) -> String {
        format!("interview:{interview_id}:turn")
    }

    async fn try_set(&self, key: &str, token: &str) -> Result<bool, AppError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Redis connection failed: {e}")))?;

        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(token)
            .arg("NX")
            .arg("PX")
            .arg(self.ttl.as_millis() as u64)
            .query_async(&mut conn)
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Redis SET NX failed: {e}")))?;

        Ok(reply.is_some())
    }
}

#[async_trait]
impl TurnLock for RedisTurnLock {
    async fn acquire(&self, interview_id: Uuid) -> Result<TurnLease, AppError> {
        let key = Self::key(interview_id);
        let lease = TurnLease::new(interview_id);
        let deadline = tokio::time::Instant::now() + ACQUIRE_WAIT;

        loop {
            if self.try_set(&key, lease.token()).await? {
                debug!("Acquired turn lock for interview {interview_id}");
                return Ok(lease);
            }
            if tokio::time::Instant::now() >= deadline {
                warn!("Turn lock for interview {interview_id} still held after {ACQUIRE_WAIT:?}");
                return Err(AppError::TurnInProgress(interview_id));
            }
            tokio::time::sleep(ACQUIRE_POLL).await;
        }
    }

    async fn release(&self, lease: TurnLease) {
        let key = Self::key(lease.interview_id);
        let mut conn = match self.client.get_multiplexed_async_connection().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!("Could not release turn lock {key}: {e}");
                return;
            }
        };

        let released: Result<i32, _> = redis::Script::new(RELEASE_SCRIPT)
            .key(&key)
            .arg(lease.token())
            .invoke_async(&mut conn)
            .await;

        match released {
            Ok(1) => debug!("Released turn lock for interview {}", lease.interview_id),
            Ok(_) => warn!("Turn lock {key} expired before release"),
            Err(e) => warn!("Could not release turn lock {key}: {e}"),
        }
    }
}
