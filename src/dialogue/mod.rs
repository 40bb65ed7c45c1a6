//! Classification Dialogue Engine
//!
//! Multi-turn design code classification. Conversation state travels inside
//! the transcript, the taxonomy is disclosed to the model one listing at a
//! time, and each turn makes at most one generative call.
//!
//! ```text
//! request ─► codec::decode ─► disclosure ─► prompt ─► LlmClient ─► reply
//!                                                                    │
//!        response ◄─ codec::attach ◄─ controller (disclose | ask | finalize)
//! ```

pub mod api;
pub mod codec;
pub mod controller;
pub mod disclosure;
pub mod gate;
pub mod prompt;
pub mod reply;
pub mod state;

pub use api::{ClassifyRequest, ClassifyResponse, ResponseStatus};
pub use codec::{decode, encode, strip_state, STATE_DELIMITER};
pub use controller::{DialogueEngine, FinalClassification, TurnOutcome, TurnResult};
pub use disclosure::{compute_disclosure, DisclosureRecord};
pub use gate::TurnGate;
pub use state::{
    ConfirmedDetails, ConfirmedFacts, ConversationState, DesignElement, DialoguePhase,
    LastRequest, Role, TaxonomySlice, TranscriptMessage,
};
