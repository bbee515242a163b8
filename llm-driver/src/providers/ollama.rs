//! Local Ollama client — `POST {baseUrl}/api/generate`, `stream=false`.
//! Direct extension of `ai-llm-service::services::ollama_service`.

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::config::LlmConfig;
use crate::errors::{ProviderError, make_snippet};

pub struct OllamaClient {
    client: reqwest::Client,
    model: String,
    url: String,
}

impl OllamaClient {
    pub fn new(cfg: &LlmConfig) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder().timeout(cfg.timeout).build()?;
        Ok(Self {
            client,
            model: cfg.model.clone(),
            url: format!("{}/api/generate", cfg.base_url.trim_end_matches('/')),
        })
    }

    pub async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, ProviderError> {
        let prompt = format!("{system_prompt}\n\n{user_prompt}");
        let body = GenerateRequest { model: &self.model, prompt: &prompt, stream: false };

        debug!(url = %self.url, "POST generate");
        let resp = self.client.post(&self.url).json(&body).send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let url = self.url.clone();
            let text = resp.text().await.unwrap_or_default();
            error!(%status, %url, "ollama returned non-success status");
            return Err(ProviderError::HttpStatus { status, url, snippet: make_snippet(&text) });
        }

        let out: GenerateResponse = resp.json().await?;
        if out.response.is_empty() {
            return Err(ProviderError::EmptyResponse);
        }
        Ok(out.response)
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}
