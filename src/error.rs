//! Error types for the classification dialogue
//!
//! Every failure that reaches the request boundary is a
//! [`ClassificationError`]. State decode problems are handled inside the
//! codec and never surface here.

use thiserror::Error;

use crate::taxonomy::CodeFormatError;

/// A failed classification turn. The conversation state is left untouched.
#[derive(Error, Debug)]
pub enum ClassificationError {
    #[error("Malformed model output: {message}")]
    MalformedModelOutput { message: String, raw: String },

    #[error("Model reply is missing the required nextStep field")]
    MissingNextStep,

    #[error("Invalid design code: {0}")]
    CodeFormat(#[from] CodeFormatError),

    #[error("Generative service did not answer within {seconds}s")]
    ServiceTimeout { seconds: u64 },

    #[error("Generative service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Classification names {count} codes, the limit is {limit}")]
    CodeLimitExceeded { count: usize, limit: usize },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ClassificationError {
    /// Stable tag used as the `type` of an error response
    pub fn kind(&self) -> &'static str {
        match self {
            ClassificationError::MalformedModelOutput { .. } => "malformed_model_output",
            ClassificationError::MissingNextStep => "missing_next_step",
            ClassificationError::CodeFormat(_) => "code_format",
            ClassificationError::ServiceTimeout { .. } => "service_timeout",
            ClassificationError::ServiceUnavailable(_) => "service_unavailable",
            ClassificationError::CodeLimitExceeded { .. } => "code_limit_exceeded",
            ClassificationError::InvalidRequest(_) => "invalid_request",
        }
    }

    /// Failures caused by the caller rather than the model or provider
    pub fn is_client_error(&self) -> bool {
        matches!(self, ClassificationError::InvalidRequest(_))
    }
}

pub type Result<T> = std::result::Result<T, ClassificationError>;
