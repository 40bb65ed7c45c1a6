//! Anthropic Messages API Client
//!
//! Alternative provider, selected with `AGENT_BACKEND=anthropic`. The API has
//! no JSON response mode, so [`LlmClient::chat_json`] adds the instruction to
//! the system prompt and relies on the reply parser to strip any fences.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

use super::llm_client::LlmClient;

/// Default Anthropic model
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 4096;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

const JSON_ONLY: &str = "IMPORTANT: Respond with a single valid JSON object only.";

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: [Message<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

/// Anthropic Claude API client
#[derive(Debug, Clone)]
pub struct AnthropicClient {
    api_key: String,
    model: String,
    client: Client,
}

impl AnthropicClient {
    /// Client for `ANTHROPIC_MODEL`, or [`DEFAULT_MODEL`] when unset
    pub fn new(api_key: String) -> Self {
        let model = std::env::var("ANTHROPIC_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        Self::with_model(api_key, model)
    }

    pub fn with_model(api_key: String, model: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            api_key,
            model: model.into(),
            client,
        }
    }

    /// Client keyed from `ANTHROPIC_API_KEY`
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .map_err(|_| anyhow!("ANTHROPIC_API_KEY environment variable not set"))?;
        Ok(Self::new(api_key))
    }

    fn request<'a>(&'a self, system: &'a str, prompt: &'a str) -> MessagesRequest<'a> {
        MessagesRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            system,
            messages: [Message {
                role: "user",
                content: prompt,
            }],
        }
    }

    async fn send(&self, system: &str, prompt: &str) -> Result<String> {
        debug!(model = %self.model, prompt_len = prompt.len(), "Sending Anthropic request");

        let response = self
            .client
            .post(MESSAGES_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&self.request(system, prompt))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(%status, "Anthropic API error: {}", body);
            return Err(anyhow!("Anthropic API error {}: {}", status, body));
        }

        let reply: MessagesResponse = response.json().await?;
        debug!(stop_reason = ?reply.stop_reason, "Anthropic replied");
        first_text(reply).ok_or_else(|| anyhow!("Empty response from Anthropic"))
    }
}

fn first_text(reply: MessagesResponse) -> Option<String> {
    reply.content.into_iter().find_map(|block| block.text)
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn chat(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        self.send(system_prompt, user_prompt).await
    }

    async fn chat_json(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let system = format!("{}\n\n{}", system_prompt, JSON_ONLY);
        self.send(&system, user_prompt).await
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn provider_name(&self) -> &str {
        "Anthropic"
    }
}
