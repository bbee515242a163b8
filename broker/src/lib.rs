//! Idempotency gate (C4), queue broker (C5) and result store (C12): three
//! thin wrappers over one shared Redis connection, grouped the way the
//! teacher groups closely related profiles behind one client cache.

pub mod errors;
pub mod gate;
pub mod result_store;
pub mod stream;

pub use errors::{BrokerError, BrokerResult};
pub use gate::{IdempotencyGate, SeenState};
pub use result_store::{ResultRecord, ResultStore};
pub use stream::{QueueBroker, QueueRecord};

use tracing::info;

#[derive(Debug, Clone)]
pub struct BrokerConfig {
    pub redis_url: String,
    pub stream: String,
    pub idempotency_ttl_secs: u64,
    pub result_ttl_secs: u64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://127.0.0.1:6379".to_string(),
            stream: "review:requests".to_string(),
            idempotency_ttl_secs: 24 * 3600,
            result_ttl_secs: 24 * 3600,
        }
    }
}

/// Owns the single Redis connection shared by the gate, the stream and the
/// result store, per spec §5's "idempotency store is the only shared
/// mutable state on the intake path" note.
#[derive(Clone)]
pub struct Broker {
    pub gate: IdempotencyGate,
    pub queue: QueueBroker,
    pub results: ResultStore,
}

impl Broker {
    pub async fn connect(cfg: &BrokerConfig) -> BrokerResult<Self> {
        let client = redis::Client::open(cfg.redis_url.as_str())?;
        let conn = client.get_connection_manager().await?;
        info!(stream = %cfg.stream, "broker connected to redis");

        Ok(Self {
            gate: IdempotencyGate::new(conn.clone(), cfg.idempotency_ttl_secs),
            queue: QueueBroker::new(conn.clone(), cfg.stream.clone()),
            results: ResultStore::new(conn, cfg.result_ttl_secs),
        })
    }
}
