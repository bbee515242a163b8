//! Crate-wide error hierarchy for broker.

use thiserror::Error;

pub type BrokerResult<T> = Result<T, BrokerError>;

/// All variants here are `Transient` per spec §7: the store failed and
/// callers MUST NOT proceed on uncertainty (§4.4).
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("poison message: {0}")]
    PoisonMessage(String),

    #[error("invalid record id: {0}")]
    InvalidRecordId(String),
}
