//! `intake`'s own error enum, following `mr-reviewer::errors` in shape.

use thiserror::Error;

pub type IntakeResult<T> = Result<T, IntakeError>;

#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("invalid webhook payload: {0}")]
    Validation(String),

    #[error("fingerprint already processed; request accepted previously")]
    AlreadyProcessed,

    #[error("idempotency gate error: {0}")]
    Broker(#[from] broker::BrokerError),
}
