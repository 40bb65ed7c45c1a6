//! Client factory
//!
//! Builds a boxed [`LlmClient`] for the configured [`AgentBackend`].

use anyhow::{anyhow, Result};
use std::sync::Arc;

use crate::anthropic_client::AnthropicClient;
use crate::backend::AgentBackend;
use crate::gemini_client::{AiConfig, GeminiClient};
use crate::llm_client::LlmClient;

/// Create a client for the backend named by `AGENT_BACKEND`, reading the
/// API key from that backend's environment variable.
pub fn create_llm_client() -> Result<Arc<dyn LlmClient>> {
    let backend = AgentBackend::from_env();
    let api_key = std::env::var(backend.api_key_var())
        .map_err(|_| anyhow!("{} environment variable not set", backend.api_key_var()))?;
    create_llm_client_with_key(backend, api_key)
}

/// Create a client for an explicit backend and key
pub fn create_llm_client_with_key(
    backend: AgentBackend,
    api_key: String,
) -> Result<Arc<dyn LlmClient>> {
    let client: Arc<dyn LlmClient> = match backend {
        AgentBackend::Gemini => Arc::new(GeminiClient::new(AiConfig {
            api_key,
            ..AiConfig::default()
        })?),
        AgentBackend::Anthropic => Arc::new(AnthropicClient::new(api_key)),
    };

    tracing::info!(
        provider = client.provider_name(),
        model = client.model_name(),
        "LLM client ready"
    );
    Ok(client)
}
