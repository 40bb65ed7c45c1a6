//! Request/response shapes of the classification operation
//!
//! These are the JSON bodies the chat UI exchanges with the engine. The HTTP
//! binding in `crate::api` only moves them over the wire.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::codec;
use super::controller::{DialogueEngine, FinalClassification, TurnOutcome, TurnResult};
use super::gate::{conversation_key, turn_fingerprint, TurnGate};
use super::state::{ConfirmedFacts, ConversationState, TaxonomySlice, TranscriptMessage};
use crate::error::{ClassificationError, Result};

/// Generic message returned with every failed turn
pub const REQUEST_FAILED: &str = "Failed to process request";

/// One classification request: the new user text plus the prior transcript
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifyRequest {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub context: Vec<TranscriptMessage>,
    /// Optional stable id; without it the transcript identifies the conversation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

impl ClassifyRequest {
    pub fn new(description: impl Into<String>, context: Vec<TranscriptMessage>) -> Self {
        Self {
            description: description.into(),
            context,
            conversation_id: None,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.description.trim().is_empty() {
            return Err(ClassificationError::InvalidRequest(
                "description must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    NeedMoreInfo,
    Complete,
    Error,
}

/// Response body for success and failure alike
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifyResponse {
    pub status: ResponseStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub questions: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<ConversationState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification: Option<FinalClassification>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmed_facts: Option<ConfirmedFacts>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub disclosed: Vec<TaxonomySlice>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
}

impl ClassifyResponse {
    pub fn from_error(error: &ClassificationError) -> Self {
        Self {
            status: ResponseStatus::Error,
            questions: None,
            state: None,
            state_message: None,
            classification: None,
            confirmed_facts: None,
            disclosed: Vec::new(),
            warnings: Vec::new(),
            error: Some(REQUEST_FAILED.to_string()),
            details: Some(error.to_string()),
            error_type: Some(error.kind().to_string()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.status == ResponseStatus::Error
    }
}

impl From<TurnResult> for ClassifyResponse {
    fn from(turn: TurnResult) -> Self {
        let status = match turn.outcome {
            TurnOutcome::Complete => ResponseStatus::Complete,
            TurnOutcome::Researching | TurnOutcome::NeedMoreInfo => ResponseStatus::NeedMoreInfo,
        };
        Self {
            status,
            questions: Some(vec![turn.message]),
            state: Some(turn.state),
            state_message: Some(turn.state_message),
            classification: turn.classification,
            confirmed_facts: turn.confirmed_facts,
            disclosed: turn.disclosed,
            warnings: turn.warnings,
            error: None,
            details: None,
            error_type: None,
        }
    }
}

impl DialogueEngine {
    /// Run one turn for a request, decoding state from its transcript
    pub async fn respond(&self, request: &ClassifyRequest) -> Result<ClassifyResponse> {
        request.validate()?;
        let state = codec::decode(&request.context);
        let turn = self
            .run_turn(&request.description, &state, &request.context)
            .await?;
        Ok(turn.into())
    }

    /// [`respond`](Self::respond) with failures turned into an error body
    pub async fn handle(&self, request: &ClassifyRequest) -> ClassifyResponse {
        match self.respond(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(kind = e.kind(), error = %e, "Classification turn failed");
                ClassifyResponse::from_error(&e)
            }
        }
    }

    /// [`handle`](Self::handle) serialized per conversation through `gate`.
    ///
    /// A first turn without a conversation id has nothing to tell unrelated
    /// users apart, so it runs ungated.
    pub async fn handle_gated(
        &self,
        gate: &TurnGate<ClassifyResponse>,
        request: &ClassifyRequest,
    ) -> ClassifyResponse {
        let anonymous = request
            .conversation_id
            .as_deref()
            .map_or(true, |id| id.trim().is_empty());
        if anonymous && request.context.is_empty() {
            debug!("Unidentified first turn, skipping the turn gate");
            return self.handle(request).await;
        }

        let key = conversation_key(request.conversation_id.as_deref(), &request.context);
        let fingerprint = turn_fingerprint(&request.context, &request.description);

        let result = gate
            .run(&key, &fingerprint, || self.respond(request))
            .await;

        match result {
            Ok(response) => response,
            Err(e) => {
                warn!(kind = e.kind(), error = %e, "Classification turn failed");
                ClassifyResponse::from_error(&e)
            }
        }
    }
}
