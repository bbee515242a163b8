//! `LlmClient`: enum-dispatch over the four providers, matching the
//! teacher's `ProviderClient`/`ai-llm-service` preference for enum dispatch
//! over `dyn` trait objects or `async-trait`.

mod anthropic;
mod gemini;
mod ollama;
mod openai;

use anthropic::AnthropicClient;
use gemini::GeminiClient;
use ollama::OllamaClient;
use openai::OpenAiClient;

use crate::config::{LlmConfig, LlmProvider};
use crate::errors::ProviderError;

pub enum LlmClient {
    OpenAi(OpenAiClient),
    Anthropic(AnthropicClient),
    Gemini(GeminiClient),
    Ollama(OllamaClient),
}

impl LlmClient {
    pub fn from_config(cfg: &LlmConfig) -> Result<Self, ProviderError> {
        Ok(match cfg.provider {
            LlmProvider::OpenAi => LlmClient::OpenAi(OpenAiClient::new(cfg)?),
            LlmProvider::Anthropic => LlmClient::Anthropic(AnthropicClient::new(cfg)?),
            LlmProvider::Gemini => LlmClient::Gemini(GeminiClient::new(cfg)?),
            LlmProvider::Ollama => LlmClient::Ollama(OllamaClient::new(cfg)?),
        })
    }

    /// Raw provider call; returns unparsed model output text.
    pub async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, ProviderError> {
        match self {
            LlmClient::OpenAi(c) => c.complete(system_prompt, user_prompt).await,
            LlmClient::Anthropic(c) => c.complete(system_prompt, user_prompt).await,
            LlmClient::Gemini(c) => c.complete(system_prompt, user_prompt).await,
            LlmClient::Ollama(c) => c.complete(system_prompt, user_prompt).await,
        }
    }
}
