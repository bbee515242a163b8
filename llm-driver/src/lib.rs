//! C7 LLM Driver: provider-agnostic `invoke(systemPrompt, userPrompt) ->
//! ReviewResultSchema`, extending `ai-llm-service`'s Ollama/OpenAI clients
//! to the full `{OPENAI, ANTHROPIC, GEMINI, OLLAMA}` set and adding the
//! spec §4.7 near-JSON recovery pipeline.

pub mod config;
pub mod errors;
pub mod providers;
pub mod recovery;
pub mod schema;
pub mod telemetry;

use tracing::{instrument, warn};

pub use config::{LlmConfig, LlmProvider};
pub use errors::{ConfigError, JsonValidationError, LlmError, LlmResult, ProviderError};
pub use schema::ReviewResult;

use providers::LlmClient;

/// Holds one resolved provider config and its HTTP client, built once at
/// startup (`ConfigError` is fatal and never surfaces per-request).
pub struct LlmDriver {
    client: LlmClient,
    provider: LlmProvider,
    model: String,
    timeout: std::time::Duration,
}

impl LlmDriver {
    pub fn new(cfg: LlmConfig) -> Result<Self, ConfigError> {
        let client = LlmClient::from_config(&cfg).map_err(|_| ConfigError::InvalidEndpoint {
            provider: provider_name(cfg.provider),
            reason: "failed to build http client",
        })?;
        Ok(Self { client, provider: cfg.provider, model: cfg.model, timeout: cfg.timeout })
    }

    pub fn provider(&self) -> LlmProvider {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// `invoke(systemPrompt, userPrompt) -> ReviewResultSchema`, applying
    /// the configured timeout (default 120s) and the six-step recovery
    /// pipeline over whatever near-JSON the provider returned.
    #[instrument(skip(self, system_prompt, user_prompt), fields(provider = %self.provider, model = %self.model))]
    pub async fn invoke(&self, system_prompt: &str, user_prompt: &str) -> LlmResult<ReviewResult> {
        let raw = tokio::time::timeout(self.timeout, self.client.complete(system_prompt, user_prompt))
            .await
            .map_err(|_| LlmError::from(ProviderError::Timeout(self.timeout)))?
            .map_err(LlmError::from)?;

        recovery::recover(&raw).map_err(|e| {
            warn!(error = %e, "recovery pipeline failed; finalizing as JSON validation failure");
            LlmError::from(e)
        })
    }
}

fn provider_name(p: LlmProvider) -> &'static str {
    match p {
        LlmProvider::OpenAi => "openai",
        LlmProvider::Anthropic => "anthropic",
        LlmProvider::Gemini => "gemini",
        LlmProvider::Ollama => "ollama",
    }
}
