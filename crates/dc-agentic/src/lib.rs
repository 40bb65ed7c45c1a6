//! Generative-text clients for the design code assistant
//!
//! This crate wraps the hosted language-model APIs behind a single
//! [`LlmClient`] trait. It knows nothing about design codes or transcripts;
//! prompt assembly and reply validation live in the `design-code-chat` crate.
//!
//! ## Backend Selection
//!
//! Set `AGENT_BACKEND` environment variable:
//! - `gemini` (default): Google Gemini API
//! - `anthropic`: Anthropic Claude API

pub mod anthropic_client;
pub mod backend;
pub mod client_factory;
pub mod gemini_client;
pub mod llm_client;

pub use backend::AgentBackend;
pub use client_factory::{create_llm_client, create_llm_client_with_key};
pub use gemini_client::{AiConfig, GeminiClient};
pub use llm_client::LlmClient;
