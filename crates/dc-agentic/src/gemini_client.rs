//! Google Gemini API Client
//!
//! Implements [`LlmClient`] over the `generateContent` endpoint. The design
//! code dialogue sends one prompt per turn and expects a single JSON object
//! back, so only the first candidate's first text part is returned.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info};

use super::llm_client::LlmClient;

/// Default Gemini model
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Gemini client errors
#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("Gemini API key is missing")]
    AuthenticationError,

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Gemini API error: {0}")]
    ApiError(String),

    #[error("Invalid Gemini response: {0}")]
    InvalidResponse(String),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Provider configuration shared by the Gemini client
#[derive(Debug, Clone)]
pub struct AiConfig {
    pub api_key: String,
    pub model: String,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub timeout_seconds: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: std::env::var("GEMINI_API_KEY").unwrap_or_default(),
            model: std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            max_tokens: Some(8192),
            temperature: Some(0.2),
            timeout_seconds: 90,
        }
    }
}

/// Gemini API client
#[derive(Debug, Clone)]
pub struct GeminiClient {
    config: AiConfig,
    client: Client,
    base_url: String,
}

/// Gemini API request format
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    role: &'static str,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
}

/// Gemini API response format
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    usage_metadata: Option<GeminiUsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiResponseContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsageMetadata {
    #[serde(default)]
    prompt_token_count: Option<u32>,
    #[serde(default)]
    candidates_token_count: Option<u32>,
    #[serde(default)]
    total_token_count: Option<u32>,
}

impl GeminiClient {
    /// Create a new Gemini client
    pub fn new(config: AiConfig) -> Result<Self, GeminiError> {
        if config.api_key.is_empty() {
            return Err(GeminiError::AuthenticationError);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            config,
            client,
            base_url: BASE_URL.to_string(),
        })
    }

    /// Create from `GEMINI_API_KEY` / `GEMINI_MODEL`
    pub fn from_env() -> Result<Self, GeminiError> {
        Self::new(AiConfig::default())
    }

    pub fn config(&self) -> &AiConfig {
        &self.config
    }

    fn build_request(&self, system_prompt: &str, user_prompt: &str, json_mode: bool) -> GeminiRequest {
        let full_prompt = if system_prompt.is_empty() {
            user_prompt.to_string()
        } else {
            format!("{}\n\n{}", system_prompt, user_prompt)
        };

        GeminiRequest {
            contents: vec![GeminiContent {
                role: "user",
                parts: vec![GeminiPart { text: full_prompt }],
            }],
            generation_config: Some(GeminiGenerationConfig {
                temperature: self.config.temperature,
                max_output_tokens: self.config.max_tokens,
                response_mime_type: json_mode.then_some("application/json"),
            }),
        }
    }

    /// Send request to Gemini API
    async fn send_request(&self, request_body: &GeminiRequest) -> Result<String, GeminiError> {
        let url = format!(
            "{}/{}:generateContent?key={}",
            self.base_url, self.config.model, self.config.api_key
        );

        debug!(
            "Sending request to Gemini API: {}",
            url.replace(&self.config.api_key, "***")
        );

        let response = self.client.post(&url).json(request_body).send().await?;

        let status = response.status();
        let response_text = response.text().await?;

        debug!("Gemini API response status: {}", status);

        if !status.is_success() {
            error!("Gemini API error: {} - {}", status, response_text);
            return Err(GeminiError::ApiError(format!(
                "HTTP {}: {}",
                status, response_text
            )));
        }

        extract_text(&response_text)
    }
}

/// Pull the first candidate's text out of a raw `generateContent` body
fn extract_text(body: &str) -> Result<String, GeminiError> {
    let gemini_response: GeminiResponse = serde_json::from_str(body).map_err(|e| {
        error!("Failed to parse Gemini response: {}", e);
        GeminiError::JsonError(e)
    })?;

    if let Some(usage) = &gemini_response.usage_metadata {
        info!(
            "Gemini API usage - Prompt: {:?} tokens, Response: {:?} tokens, Total: {:?} tokens",
            usage.prompt_token_count, usage.candidates_token_count, usage.total_token_count
        );
    }

    let candidate = gemini_response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| GeminiError::InvalidResponse("No candidates in response".to_string()))?;

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.is_empty() {
        return Err(GeminiError::InvalidResponse(format!(
            "No text in candidate (finish reason: {})",
            candidate.finish_reason.as_deref().unwrap_or("unknown")
        )));
    }

    Ok(text)
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn chat(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let request = self.build_request(system_prompt, user_prompt, false);
        Ok(self.send_request(&request).await?)
    }

    async fn chat_json(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let request = self.build_request(system_prompt, user_prompt, true);
        Ok(self.send_request(&request).await?)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }

    fn provider_name(&self) -> &str {
        "Gemini"
    }
}
