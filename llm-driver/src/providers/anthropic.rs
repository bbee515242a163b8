//! Anthropic Messages API client — `POST {baseUrl}/v1/messages`. New
//! provider required by spec §4.7, built by hand with `reqwest` in the
//! teacher's style (no vendor SDK crate), matching spec §1's exclusion of
//! vendor LLM SDKs.

use reqwest::header;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::config::LlmConfig;
use crate::errors::{ProviderError, make_snippet};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 4096;

pub struct AnthropicClient {
    client: reqwest::Client,
    model: String,
    url: String,
}

impl AnthropicClient {
    pub fn new(cfg: &LlmConfig) -> Result<Self, ProviderError> {
        let api_key = cfg.api_key.as_deref().unwrap_or_default();
        let mut headers = header::HeaderMap::new();
        headers.insert(
            "x-api-key",
            header::HeaderValue::from_str(api_key).unwrap_or_else(|_| header::HeaderValue::from_static("")),
        );
        headers.insert("anthropic-version", header::HeaderValue::from_static(ANTHROPIC_VERSION));
        let client = reqwest::Client::builder()
            .timeout(cfg.timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            model: cfg.model.clone(),
            url: format!("{}/v1/messages", cfg.base_url.trim_end_matches('/')),
        })
    }

    pub async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, ProviderError> {
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: DEFAULT_MAX_TOKENS,
            system: system_prompt,
            messages: vec![Message { role: "user", content: user_prompt }],
        };

        debug!(url = %self.url, "POST messages");
        let resp = self.client.post(&self.url).json(&body).send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let url = self.url.clone();
            let text = resp.text().await.unwrap_or_default();
            error!(%status, %url, "anthropic returned non-success status");
            return Err(ProviderError::HttpStatus { status, url, snippet: make_snippet(&text) });
        }

        let out: MessagesResponse = resp.json().await?;
        out.content
            .into_iter()
            .find_map(|block| if block.block_type == "text" { block.text } else { None })
            .ok_or(ProviderError::EmptyResponse)
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: Option<String>,
}
