//! Idempotency Gate (C4): atomic first-seen check on a fingerprint key.

use redis::AsyncCommands;
use tracing::{debug, instrument};

use crate::errors::BrokerResult;

/// Outcome of [`IdempotencyGate::check_and_mark`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeenState {
    FirstSeen,
    Duplicate,
}

#[derive(Clone)]
pub struct IdempotencyGate {
    conn: redis::aio::ConnectionManager,
    ttl_secs: u64,
}

impl IdempotencyGate {
    pub fn new(conn: redis::aio::ConnectionManager, ttl_secs: u64) -> Self {
        Self { conn, ttl_secs }
    }

    fn key(fingerprint: &str) -> String {
        format!("review:seen:{fingerprint}")
    }

    /// `SET key 1 NX EX ttl`: atomic across concurrent callers. A concurrent
    /// second caller with the same key observes `Duplicate`.
    #[instrument(skip(self), fields(fingerprint = %fingerprint))]
    pub async fn check_and_mark(&self, fingerprint: &str) -> BrokerResult<SeenState> {
        let mut conn = self.conn.clone();
        let key = Self::key(fingerprint);

        let set: Option<String> = redis::cmd("SET")
            .arg(&key)
            .arg(1)
            .arg("NX")
            .arg("EX")
            .arg(self.ttl_secs)
            .query_async(&mut conn)
            .await?;

        match set {
            Some(_) => {
                debug!(%key, "fingerprint first seen");
                Ok(SeenState::FirstSeen)
            }
            None => {
                debug!(%key, "fingerprint duplicate");
                Ok(SeenState::Duplicate)
            }
        }
    }

    /// Test/diagnostic helper; not on the critical path.
    pub async fn forget(&self, fingerprint: &str) -> BrokerResult<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(Self::key(fingerprint)).await?;
        Ok(())
    }
}
