//! Result Store (C12): TTL'd key-value record of per-request status/payload.

use chrono::{DateTime, Utc};
use redis::AsyncCommands;
use review_model::{AggregatedReview, ReviewStatus};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::errors::BrokerResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultRecord {
    pub status: ReviewStatus,
    pub result: Option<AggregatedReview>,
    pub error: Option<String>,
    pub llm_provider: Option<String>,
    pub llm_model: Option<String>,
    pub processing_time_ms: Option<u64>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct ResultStore {
    conn: redis::aio::ConnectionManager,
    ttl_secs: u64,
}

impl ResultStore {
    pub fn new(conn: redis::aio::ConnectionManager, ttl_secs: u64) -> Self {
        Self { conn, ttl_secs }
    }

    fn key(request_id: &str) -> String {
        format!("review:result:{request_id}")
    }

    #[instrument(skip(self, record), fields(%request_id, status = ?record.status))]
    pub async fn write(&self, request_id: &str, record: &ResultRecord) -> BrokerResult<()> {
        let mut conn = self.conn.clone();
        let key = Self::key(request_id);

        if let Some(existing) = self.read(request_id).await? {
            if !existing.status.can_transition_to(record.status) && existing.status != record.status {
                warn!(%request_id, from = ?existing.status, to = ?record.status, "non-monotonic result-store transition; later write wins");
            }
        }

        let serialized = serde_json::to_string(record)?;
        let _: () = conn.set_ex(&key, serialized, self.ttl_secs).await?;
        debug!(%key, "result store updated");
        Ok(())
    }

    pub async fn read(&self, request_id: &str) -> BrokerResult<Option<ResultRecord>> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(Self::key(request_id)).await?;
        match raw {
            Some(s) => Ok(Some(serde_json::from_str(&s)?)),
            None => Ok(None),
        }
    }
}
