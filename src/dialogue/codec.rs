//! Transcript State Codec
//!
//! Embeds [`ConversationState`] at the end of an assistant message behind a
//! fixed delimiter, and recovers it from the most recent assistant message
//! carrying one. A corrupt payload resets the conversation to the default
//! state instead of failing the turn.

use thiserror::Error;
use tracing::{debug, warn};

use super::state::{ConversationState, Role, TranscriptMessage};

/// Separates visible assistant text from the serialized state
pub const STATE_DELIMITER: &str = "__STATE__:";

/// Why an embedded state payload could not be used
#[derive(Debug, Error)]
pub enum StateDecodeError {
    #[error("State payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("State payload is empty")]
    Empty,
}

/// Serialize `state` as a suffix to append to visible assistant text
pub fn encode(state: &ConversationState) -> String {
    // Serializing plain data structures cannot fail
    let json = serde_json::to_string(state).unwrap_or_else(|_| "{}".to_string());
    format!("\n\n{}{}", STATE_DELIMITER, json)
}

/// Visible text followed by the encoded state
pub fn attach(visible: &str, state: &ConversationState) -> String {
    format!("{}{}", visible, encode(state))
}

/// Remove the delimiter and everything after it
pub fn strip_state(content: &str) -> &str {
    match content.split_once(STATE_DELIMITER) {
        Some((visible, _)) => visible.trim_end(),
        None => content,
    }
}

/// The default state of a new conversation
pub fn default_state() -> ConversationState {
    ConversationState::default()
}

/// Find and parse the state in the most recent assistant message that has one.
///
/// Returns `Ok(None)` when no assistant message carries a delimiter. Only the
/// newest candidate is considered; older payloads are never consulted.
pub fn try_decode(
    transcript: &[TranscriptMessage],
) -> Result<Option<ConversationState>, StateDecodeError> {
    let Some(message) = transcript
        .iter()
        .rev()
        .find(|m| m.role == Role::Assistant && m.content.contains(STATE_DELIMITER))
    else {
        return Ok(None);
    };

    let payload = message
        .content
        .split_once(STATE_DELIMITER)
        .map(|(_, payload)| payload.trim())
        .unwrap_or_default();

    if payload.is_empty() {
        return Err(StateDecodeError::Empty);
    }

    Ok(Some(serde_json::from_str(payload)?))
}

/// Recover the conversation state, falling back to the default on any failure
pub fn decode(transcript: &[TranscriptMessage]) -> ConversationState {
    match try_decode(transcript) {
        Ok(Some(state)) => {
            debug!(
                elements = state.elements.len(),
                has_current = state.current_element_id.is_some(),
                "Restored conversation state"
            );
            state
        }
        Ok(None) => {
            debug!("No embedded state, starting fresh");
            default_state()
        }
        Err(e) => {
            warn!(error = %e, "Embedded state unreadable, starting fresh");
            default_state()
        }
    }
}
