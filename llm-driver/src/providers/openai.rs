//! OpenAI (ChatGPT) client — `POST {baseUrl}/v1/chat/completions`,
//! non-streaming. Direct extension of `ai-llm-service::services::open_ai_service`.

use reqwest::header;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::config::LlmConfig;
use crate::errors::{ProviderError, make_snippet};

pub struct OpenAiClient {
    client: reqwest::Client,
    model: String,
    url: String,
}

impl OpenAiClient {
    pub fn new(cfg: &LlmConfig) -> Result<Self, ProviderError> {
        let api_key = cfg.api_key.as_deref().unwrap_or_default();
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {api_key}"))
                .unwrap_or_else(|_| header::HeaderValue::from_static("")),
        );
        let client = reqwest::Client::builder()
            .timeout(cfg.timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            model: cfg.model.clone(),
            url: format!("{}/v1/chat/completions", cfg.base_url.trim_end_matches('/')),
        })
    }

    pub async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, ProviderError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: system_prompt },
                ChatMessage { role: "user", content: user_prompt },
            ],
        };

        debug!(url = %self.url, "POST chat completion");
        let resp = self.client.post(&self.url).json(&body).send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let url = self.url.clone();
            let text = resp.text().await.unwrap_or_default();
            error!(%status, %url, "openai returned non-success status");
            return Err(ProviderError::HttpStatus { status, url, snippet: make_snippet(&text) });
        }

        let out: ChatResponse = resp.json().await?;
        out.choices
            .into_iter()
            .find_map(|c| c.message.content)
            .ok_or(ProviderError::EmptyResponse)
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageOut,
}

#[derive(Deserialize)]
struct ChatMessageOut {
    content: Option<String>,
}
