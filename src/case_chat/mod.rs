//! Case chat
//!
//! Free-form questions about one trademark case. Unlike the classification
//! dialogue there is no embedded state: each request carries the case data and
//! the visible history, and gets one plain-text answer back.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use dc_agentic::LlmClient;

use crate::config::DEFAULT_LLM_TIMEOUT_SECS;
use crate::dialogue::{strip_state, Role, TranscriptMessage};

/// Paralegal role, amendment notation and filing-basis glossary
pub const CASE_SYSTEM_PROMPT: &str = include_str!("prompts/paralegal_system.md");

/// Prefix the UI puts in front of serialized case data
pub const CASE_DATA_PREFIX: &str = "Full Case Data:";

const RULE: &str =
    "----------------------------------------------------------------------------------------------------";

#[derive(Error, Debug)]
pub enum CaseChatError {
    #[error("Missing required fields: message and caseData are required.")]
    MissingFields,

    #[error("Invalid caseData format: {0}")]
    InvalidCaseData(String),

    #[error("Generative service did not answer within {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Generative service unavailable: {0}")]
    Service(String),
}

impl CaseChatError {
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            CaseChatError::MissingFields | CaseChatError::InvalidCaseData(_)
        )
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseChatRequest {
    #[serde(default)]
    pub message: String,
    /// A JSON object, or a string `Full Case Data: {...}`
    #[serde(default)]
    pub case_data: Value,
    #[serde(default)]
    pub context: Vec<TranscriptMessage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CaseChatResponse {
    pub response: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseChatErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl From<&CaseChatError> for CaseChatErrorBody {
    fn from(error: &CaseChatError) -> Self {
        if error.is_client_error() {
            Self {
                error: error.to_string(),
                details: None,
            }
        } else {
            Self {
                error: "An internal server error occurred".to_string(),
                details: Some(error.to_string()),
            }
        }
    }
}

/// Normalize `caseData` into a JSON object
pub fn parse_case_data(case_data: &Value) -> Result<Value, CaseChatError> {
    match case_data {
        Value::Object(_) => Ok(case_data.clone()),
        Value::String(text) => {
            let json = text
                .trim()
                .strip_prefix(CASE_DATA_PREFIX)
                .ok_or_else(|| {
                    CaseChatError::InvalidCaseData(format!(
                        "expected text starting with '{}'",
                        CASE_DATA_PREFIX
                    ))
                })?
                .trim();
            let parsed: Value = serde_json::from_str(json)
                .map_err(|e| CaseChatError::InvalidCaseData(e.to_string()))?;
            if parsed.is_object() {
                Ok(parsed)
            } else {
                Err(CaseChatError::InvalidCaseData(
                    "case data is not an object".to_string(),
                ))
            }
        }
        Value::Null => Err(CaseChatError::MissingFields),
        _ => Err(CaseChatError::InvalidCaseData(
            "expected an object or a string".to_string(),
        )),
    }
}

/// `User: ...` / `Assistant: ...` lines, without embedded state
pub fn format_case_history(context: &[TranscriptMessage]) -> String {
    context
        .iter()
        .map(|m| {
            let speaker = match m.role {
                Role::User => "User",
                Role::Assistant => "Assistant",
            };
            format!("{}: {}", speaker, strip_state(&m.content))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// User prompt: case data, history and the question
pub fn build_case_prompt(case_data: &Value, context: &[TranscriptMessage], message: &str) -> String {
    let case_text =
        serde_json::to_string_pretty(case_data).unwrap_or_else(|_| case_data.to_string());

    let mut prompt = format!("{RULE}\nCase Data:\n{case_text}\n{RULE}\n");
    if !context.is_empty() {
        prompt.push_str(&format!(
            "Conversation History:\n{}\n{RULE}\n",
            format_case_history(context)
        ));
    }
    prompt.push_str(&format!("User: {}\n", message));
    prompt
}

/// Answers questions about a case with one generative call each
pub struct CaseChat {
    llm: Arc<dyn LlmClient>,
    timeout: Duration,
}

impl CaseChat {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self {
            llm,
            timeout: Duration::from_secs(DEFAULT_LLM_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn answer(&self, request: &CaseChatRequest) -> Result<CaseChatResponse, CaseChatError> {
        if request.message.trim().is_empty() || request.case_data.is_null() {
            warn!("Case chat request without message or case data");
            return Err(CaseChatError::MissingFields);
        }
        let case_data = parse_case_data(&request.case_data)?;
        let prompt = build_case_prompt(&case_data, &request.context, &request.message);

        info!(
            history = request.context.len(),
            provider = self.llm.provider_name(),
            "Answering case question"
        );
        debug!(prompt_len = prompt.len(), "Built case prompt");

        let response = tokio::time::timeout(self.timeout, self.llm.chat(CASE_SYSTEM_PROMPT, &prompt))
            .await
            .map_err(|_| CaseChatError::Timeout {
                seconds: self.timeout.as_secs(),
            })?
            .map_err(|e| CaseChatError::Service(format!("{:#}", e)))?;

        Ok(CaseChatResponse { response })
    }
}
