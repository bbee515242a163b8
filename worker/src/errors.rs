//! Root error type for the worker loop, aggregating every component crate's
//! error via `#[from]` (spec §7's error taxonomy), following
//! `mr-reviewer::errors::Error`'s shape.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("queue/store error: {0}")]
    Broker(#[from] broker::BrokerError),

    #[error("scm collaborator error: {0}")]
    Scm(#[from] scm_client::ScmError),

    #[error("llm driver error: {0}")]
    Llm(#[from] llm_driver::LlmError),

    #[error("sandbox runner error: {0}")]
    Sandbox(#[from] sandbox_runner::SandboxError),

    #[error("change request is no longer accessible (404/410)")]
    ChangeRequestGone,

    #[error("validation error: {0}")]
    Validation(String),
}

impl WorkerError {
    /// §7: everything except `JsonValidationError`/validation/gone is
    /// retried with exponential backoff; `JsonValidationError` finalizes
    /// the request as FAILED without retry.
    pub fn is_retriable(&self) -> bool {
        match self {
            WorkerError::Llm(llm_driver::LlmError::JsonValidation(_)) => false,
            WorkerError::ChangeRequestGone | WorkerError::Validation(_) => false,
            WorkerError::Llm(e) => e.is_transient(),
            WorkerError::Scm(e) => e.is_transient(),
            WorkerError::Broker(_) | WorkerError::Sandbox(_) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_validation_errors_never_retry() {
        let err = WorkerError::Llm(llm_driver::LlmError::JsonValidation(llm_driver::JsonValidationError::NoJsonObject));
        assert!(!err.is_retriable());
    }

    #[test]
    fn change_request_gone_never_retries() {
        assert!(!WorkerError::ChangeRequestGone.is_retriable());
    }
}
