//! Backend selection
//!
//! Reads `AGENT_BACKEND` to decide which provider serves generative calls.

use std::fmt;
use std::str::FromStr;

/// Supported generative-text providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AgentBackend {
    #[default]
    Gemini,
    Anthropic,
}

impl AgentBackend {
    /// Resolve the backend from `AGENT_BACKEND`, defaulting to Gemini.
    ///
    /// Unknown values fall back to the default with a warning.
    pub fn from_env() -> Self {
        match std::env::var("AGENT_BACKEND") {
            Ok(value) => value.parse().unwrap_or_else(|_| {
                tracing::warn!(backend = %value, "Unknown AGENT_BACKEND, using gemini");
                AgentBackend::default()
            }),
            Err(_) => AgentBackend::default(),
        }
    }

    /// Environment variable holding the API key for this backend
    pub fn api_key_var(&self) -> &'static str {
        match self {
            AgentBackend::Gemini => "GEMINI_API_KEY",
            AgentBackend::Anthropic => "ANTHROPIC_API_KEY",
        }
    }
}

impl FromStr for AgentBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" | "google" => Ok(AgentBackend::Gemini),
            "anthropic" | "claude" => Ok(AgentBackend::Anthropic),
            other => Err(format!("unknown agent backend '{}'", other)),
        }
    }
}

impl fmt::Display for AgentBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentBackend::Gemini => write!(f, "gemini"),
            AgentBackend::Anthropic => write!(f, "anthropic"),
        }
    }
}
