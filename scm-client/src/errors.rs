//! Crate-wide error hierarchy for scm-client.

use thiserror::Error;

pub type ScmResult<T> = Result<T, ScmError>;

#[derive(Debug, Error)]
pub enum ScmError {
    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,

    #[error("not found")]
    NotFound,

    #[error("rate limited")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("server error: status {0}")]
    Server(u16),

    #[error("http status error: status {0}")]
    HttpStatus(u16),

    #[error("timeout")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid provider response: {0}")]
    InvalidResponse(String),

    #[error("missing provider token")]
    MissingToken,
}

impl From<reqwest::Error> for ScmError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return ScmError::Timeout;
        }
        if let Some(status) = e.status() {
            let code = status.as_u16();
            return match code {
                401 => ScmError::Unauthorized,
                403 => ScmError::Forbidden,
                404 => ScmError::NotFound,
                429 => ScmError::RateLimited { retry_after_secs: None },
                500..=599 => ScmError::Server(code),
                _ => ScmError::HttpStatus(code),
            };
        }
        ScmError::Network(e.to_string())
    }
}

/// `Transient` per spec §7: retry with backoff is the worker loop's call,
/// not this crate's — it just reports which category applies.
impl ScmError {
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ScmError::RateLimited { .. } | ScmError::Server(_) | ScmError::Timeout | ScmError::Network(_)
        )
    }
}
