//! Queue Broker (C5): append-only stream with consumer-group semantics,
//! backed by Redis Streams (`XADD`/`XREADGROUP`/`XACK`/`XPENDING`).

use std::time::Duration;

use redis::streams::{StreamReadOptions, StreamReadReply};
use redis::AsyncCommands;
use review_model::ReviewRequest;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::errors::{BrokerError, BrokerResult};

/// Two fields per spec §6: `requestId` and `payload` (JSON of the request).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueRecord {
    pub id: String,
    pub request_id: String,
    pub payload: ReviewRequest,
}

#[derive(Clone)]
pub struct QueueBroker {
    conn: redis::aio::ConnectionManager,
    stream: String,
}

impl QueueBroker {
    pub fn new(conn: redis::aio::ConnectionManager, stream: impl Into<String>) -> Self {
        Self { conn, stream: stream.into() }
    }

    /// Idempotent: ignores `BUSYGROUP` when the group already exists.
    pub async fn ensure_group(&self, group: &str) -> BrokerResult<()> {
        let mut conn = self.conn.clone();
        let res: Result<(), redis::RedisError> = conn.xgroup_create_mkstream(&self.stream, group, "0").await;
        if let Err(e) = res {
            if !e.to_string().contains("BUSYGROUP") {
                return Err(e.into());
            }
        }
        Ok(())
    }

    /// `append(record)` is O(1) and returns a monotonically increasing id.
    #[instrument(skip(self, request), fields(stream = %self.stream, request_id = %request.request_id))]
    pub async fn append(&self, request: &ReviewRequest) -> BrokerResult<String> {
        let mut conn = self.conn.clone();
        let payload = serde_json::to_string(request)?;
        let id: String = conn
            .xadd(&self.stream, "*", &[("requestId", request.request_id.as_str()), ("payload", payload.as_str())])
            .await?;
        debug!(%id, "appended record to stream");
        Ok(id)
    }

    /// `claim(group, consumer, maxBatch, blockFor)`: returns up to `maxBatch`
    /// unacknowledged records, establishing an implicit lease.
    #[instrument(skip(self), fields(stream = %self.stream, %group, %consumer))]
    pub async fn claim(&self, group: &str, consumer: &str, max_batch: usize, block_for: Duration) -> BrokerResult<Vec<QueueRecord>> {
        let mut conn = self.conn.clone();
        let opts = StreamReadOptions::default()
            .group(group, consumer)
            .count(max_batch)
            .block(block_for.as_millis() as usize);

        let reply: StreamReadReply = conn.xread_options(&[&self.stream], &[">"], &opts).await?;
        self.decode_reply(reply)
    }

    /// `ack(group, id)` removes the record from pending for that group.
    #[instrument(skip(self), fields(stream = %self.stream, %group, %id))]
    pub async fn ack(&self, group: &str, id: &str) -> BrokerResult<()> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.xack(&self.stream, group, &[id]).await?;
        Ok(())
    }

    /// `readPending(group)` lists leased-but-unacked records for recovery.
    #[instrument(skip(self), fields(stream = %self.stream, %group))]
    pub async fn read_pending(&self, group: &str) -> BrokerResult<Vec<QueueRecord>> {
        let mut conn = self.conn.clone();
        let pending: redis::streams::StreamPendingCountReply =
            conn.xpending_count(&self.stream, group, "-", "+", 1000).await?;

        if pending.ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut records = Vec::with_capacity(pending.ids.len());
        for entry in pending.ids {
            let ranged: StreamReadReply = {
                let res: redis::streams::StreamRangeReply = conn.xrange(&self.stream, &entry.id, &entry.id).await?;
                StreamReadReply { keys: vec![redis::streams::StreamKey { key: self.stream.clone(), ids: res.ids }] }
            };
            match self.decode_reply(ranged) {
                Ok(mut recs) => records.append(&mut recs),
                Err(e) => warn!(id = %entry.id, error = %e, "skipping poison pending entry"),
            }
        }
        Ok(records)
    }

    fn decode_reply(&self, reply: StreamReadReply) -> BrokerResult<Vec<QueueRecord>> {
        let mut out = Vec::new();
        for key in reply.keys {
            for stream_id in key.ids {
                let request_id: String = stream_id
                    .map
                    .get("requestId")
                    .and_then(|v| redis::from_redis_value::<String>(v).ok())
                    .ok_or_else(|| BrokerError::PoisonMessage(format!("missing requestId in {}", stream_id.id)))?;

                let payload_raw: String = stream_id
                    .map
                    .get("payload")
                    .and_then(|v| redis::from_redis_value::<String>(v).ok())
                    .ok_or_else(|| BrokerError::PoisonMessage(format!("missing payload in {}", stream_id.id)))?;

                let payload: ReviewRequest = serde_json::from_str(&payload_raw)
                    .map_err(|e| BrokerError::PoisonMessage(format!("malformed payload in {}: {e}", stream_id.id)))?;

                out.push(QueueRecord { id: stream_id.id, request_id, payload });
            }
        }
        Ok(out)
    }
}
