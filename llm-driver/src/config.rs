//! Provider selection and per-provider settings, extending the teacher's
//! `LlmProvider`/`LlmModelConfig` pair to the four-provider set required by
//! spec §4.7 and the `llm.*` configuration surface from spec §6.

use std::time::Duration;

use crate::errors::{ConfigError, must_env};

/// One of spec §4.7's enumerated providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    OpenAi,
    Anthropic,
    Gemini,
    Ollama,
}

impl LlmProvider {
    pub fn from_str_config(s: &str) -> Result<Self, ConfigError> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Ok(LlmProvider::OpenAi),
            "anthropic" => Ok(LlmProvider::Anthropic),
            "gemini" => Ok(LlmProvider::Gemini),
            "ollama" => Ok(LlmProvider::Ollama),
            other => Err(ConfigError::UnsupportedProvider(other.to_string())),
        }
    }
}

impl std::fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LlmProvider::OpenAi => "openai",
            LlmProvider::Anthropic => "anthropic",
            LlmProvider::Gemini => "gemini",
            LlmProvider::Ollama => "ollama",
        };
        f.write_str(s)
    }
}

/// Resolved configuration for a single invocation: which provider, which
/// model/endpoint/key, and the shared §4.7 default 120s timeout.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub model: String,
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

const DEFAULT_TIMEOUT_SECS: u64 = 120;

impl LlmConfig {
    /// Builds from `llm.{provider, openai.*, anthropic.*, gemini.*, ollama.*,
    /// timeout}` per spec §6. Fails fast (`ConfigError`) at startup; never
    /// called per-request.
    pub fn from_env() -> Result<Self, ConfigError> {
        let provider = LlmProvider::from_str_config(&must_env("LLM_PROVIDER")?)?;
        let timeout_secs = std::env::var("LLM_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let (model, base_url, api_key) = match provider {
            LlmProvider::OpenAi => (
                must_env("OPENAI_MODEL")?,
                std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com".into()),
                Some(must_env("OPENAI_API_KEY")?),
            ),
            LlmProvider::Anthropic => (
                must_env("ANTHROPIC_MODEL")?,
                std::env::var("ANTHROPIC_BASE_URL").unwrap_or_else(|_| "https://api.anthropic.com".into()),
                Some(must_env("ANTHROPIC_API_KEY")?),
            ),
            LlmProvider::Gemini => (
                must_env("GEMINI_MODEL")?,
                std::env::var("GEMINI_BASE_URL")
                    .unwrap_or_else(|_| "https://generativelanguage.googleapis.com".into()),
                Some(must_env("GEMINI_API_KEY")?),
            ),
            LlmProvider::Ollama => (
                must_env("OLLAMA_MODEL")?,
                std::env::var("OLLAMA_BASE_URL").unwrap_or_else(|_| "http://localhost:11434".into()),
                None,
            ),
        };

        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidEndpoint {
                provider: provider_name(provider),
                reason: "must start with http:// or https://",
            });
        }

        Ok(Self {
            provider,
            model,
            base_url,
            api_key,
            timeout: Duration::from_secs(timeout_secs),
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_provider() {
        assert!(LlmProvider::from_str_config("mistral").is_err());
    }

    #[test]
    fn accepts_case_insensitive_names() {
        assert_eq!(LlmProvider::from_str_config("OpenAI").unwrap(), LlmProvider::OpenAi);
        assert_eq!(LlmProvider::from_str_config("OLLAMA").unwrap(), LlmProvider::Ollama);
    }
}
