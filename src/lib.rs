//! Design Code Chat
//!
//! Trademark design-code classification by conversation. A user describes a
//! figurative element, and a language model walks the three-level design code
//! catalog (category → division → section) with them until the element is
//! classified.
//!
//! ## Architecture
//! Each turn flows through one path:
//! Transcript -> State Codec -> Disclosure Tracker -> Prompt -> LLM -> Turn Controller
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use design_code_chat::dialogue::{ClassifyRequest, DialogueEngine};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let llm = dc_agentic::create_llm_client()?;
//! let engine = DialogueEngine::new(llm);
//! let response = engine
//!     .handle(&ClassifyRequest::new("a five-pointed star", Vec::new()))
//!     .await;
//! println!("{:?}", response.questions);
//! # Ok(())
//! # }
//! ```

// Core error handling
pub mod error;

// Environment-driven settings
pub mod config;

// Static design code catalog
pub mod taxonomy;

// Multi-turn classification protocol
pub mod dialogue;

// Free-form questions about a case
pub mod case_chat;

// HTTP binding (when enabled)
#[cfg(feature = "server")]
pub mod api;

pub use config::{CodeLimitPolicy, EngineConfig};
pub use dialogue::{ClassifyRequest, ClassifyResponse, DialogueEngine, TurnOutcome};
pub use error::ClassificationError;
pub use taxonomy::TaxonomyStore;
