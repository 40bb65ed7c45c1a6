//! LLM Client Trait
//!
//! Unified interface for generative-text providers (Gemini, Anthropic).

use anyhow::Result;
use async_trait::async_trait;

/// Unified LLM client interface
///
/// A single call is one round trip to the provider. Callers own retries and
/// deadlines; implementations never loop on their own.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Call the LLM with system + user prompts, return raw text response
    async fn chat(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;

    /// Call the LLM expecting a JSON response
    /// - For Gemini: sets `responseMimeType` to `application/json`
    /// - For Anthropic: adds JSON instruction to system prompt
    async fn chat_json(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;

    /// Get the model name for logging
    fn model_name(&self) -> &str;

    /// Get the provider name for logging
    fn provider_name(&self) -> &str;
}
