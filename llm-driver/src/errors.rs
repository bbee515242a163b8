//! Error hierarchy for `llm-driver`, mirroring the `[AI LLM Service]`-style
//! taxonomy but mapped onto spec §7's three C7 categories: `ConfigError`
//! (fatal, startup only), `ProviderError` (transient, retriable),
//! `JsonValidationError` (unrecoverable model output, no retry).

use reqwest::StatusCode;
use thiserror::Error;

pub type LlmResult<T> = Result<T, LlmError>;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("llm-driver config error: {0}")]
    Config(#[from] ConfigError),

    #[error("llm-driver provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("llm-driver json validation error: {0}")]
    JsonValidation(#[from] JsonValidationError),
}

impl LlmError {
    /// §7: only `Provider` is retriable; `Config` is fatal-at-startup,
    /// `JsonValidation` finalizes the request as FAILED without retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, LlmError::Provider(p) if p.is_transient())
    }
}

/// Missing API key or model — fail fast at startup, never per-request.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("unsupported llm provider: {0}")]
    UnsupportedProvider(String),

    #[error("invalid endpoint for {provider}: {reason}")]
    InvalidEndpoint { provider: &'static str, reason: &'static str },

    #[error("missing api key for provider: {0}")]
    MissingApiKey(&'static str),
}

pub fn must_env(name: &'static str) -> Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::MissingVar(name)),
    }
}

/// Transient; retriable with exponential backoff per §7.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("http transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected status {status} from {url}: {snippet}")]
    HttpStatus { status: StatusCode, url: String, snippet: String },

    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("empty response from provider")]
    EmptyResponse,
}

impl ProviderError {
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Transport(_) => true,
            ProviderError::HttpStatus { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            ProviderError::Timeout(_) => true,
            ProviderError::EmptyResponse => true,
        }
    }
}

/// Model output structure unrecoverable after the §4.7 pipeline.
#[derive(Debug, Error)]
pub enum JsonValidationError {
    #[error("no JSON object found in model output")]
    NoJsonObject,

    #[error("failed to parse recovered JSON: {0}")]
    ParseFailed(String),

    #[error("recovered JSON missing required field: {0}")]
    MissingField(&'static str),
}

/// Truncates a response body to a log-safe snippet.
pub fn make_snippet(text: &str) -> String {
    text.chars().take(240).collect()
}
