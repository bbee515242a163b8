//! Gemini `generateContent` client — `POST
//! {baseUrl}/v1beta/models/{model}:generateContent?key=...`. New provider
//! required by spec §4.7, hand-rolled with `reqwest` like the Anthropic
//! client and the teacher's existing Ollama/OpenAI clients.

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::config::LlmConfig;
use crate::errors::{ProviderError, make_snippet};

pub struct GeminiClient {
    client: reqwest::Client,
    url: String,
}

impl GeminiClient {
    pub fn new(cfg: &LlmConfig) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder().timeout(cfg.timeout).build()?;
        let api_key = cfg.api_key.as_deref().unwrap_or_default();
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            cfg.base_url.trim_end_matches('/'),
            cfg.model,
            api_key
        );
        Ok(Self { client, url })
    }

    pub async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, ProviderError> {
        let body = GenerateContentRequest {
            system_instruction: Content { parts: vec![Part { text: system_prompt.to_string() }] },
            contents: vec![Content { parts: vec![Part { text: user_prompt.to_string() }] }],
        };

        debug!(url = %self.url, "POST generateContent");
        let resp = self.client.post(&self.url).json(&body).send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let url = self.url.clone();
            let text = resp.text().await.unwrap_or_default();
            error!(%status, %url, "gemini returned non-success status");
            return Err(ProviderError::HttpStatus { status, url, snippet: make_snippet(&text) });
        }

        let out: GenerateContentResponse = resp.json().await?;
        out.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .filter(|t| !t.is_empty())
            .ok_or(ProviderError::EmptyResponse)
    }
}

#[derive(Serialize)]
struct GenerateContentRequest {
    #[serde(rename = "systemInstruction")]
    system_instruction: Content,
    contents: Vec<Content>,
}

#[derive(Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Content,
}
