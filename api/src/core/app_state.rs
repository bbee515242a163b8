use std::sync::Arc;

use thiserror::Error;

/// Shared state for handlers.
#[derive(Clone)]
pub struct AppState {
    pub broker: Arc<broker::Broker>,
    /// Shared secret protecting the webhook endpoint from unauthorized callers.
    pub webhook_secret: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnv(&'static str),
}
