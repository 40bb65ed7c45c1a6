//! Dialogue Turn Controller
//!
//! Runs one classification turn: works out what the model has already seen,
//! builds the prompt, makes exactly one generative call, and decides whether
//! to disclose more of the taxonomy, ask the user something, or finalize.
//!
//! A turn never loops back into the model. When the model asks for a listing
//! the turn ends with the listing attached to the visible reply, and the next
//! user message picks the conversation up from there.
//!
//! The incoming state is never mutated. A failed turn returns an error and
//! the caller's state stays valid for a retry.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use dc_agentic::LlmClient;

use super::codec;
use super::disclosure::{DisclosureRecord, LISTING_SEPARATOR};
use super::prompt::{TurnPrompt, SYSTEM_PROMPT};
use super::reply::{parse_model_reply, ModelReply, ProposedClassification, ReplyStatus};
use super::state::{ConfirmedFacts, ConversationState, DesignElement, LastRequest, TaxonomySlice, TranscriptMessage};
use crate::config::{CodeLimitPolicy, EngineConfig};
use crate::error::{ClassificationError, Result};
use crate::taxonomy::{
    finalize_full_code, format_divisions, format_sections, normalize_part, parse_full_code,
    CodeLevel, TaxonomyLoadError, TaxonomyStore,
};

const FALLBACK_QUESTION: &str = "Could you tell me more about the design?";

/// What a turn produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnOutcome {
    /// A listing was attached; the model continues next turn
    Researching,
    /// The model asked the user a question
    NeedMoreInfo,
    /// The current element is classified
    Complete,
}

/// A finalized classification of one element
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalClassification {
    pub category_code: String,
    pub category_reasoning: String,
    pub division_codes: Vec<String>,
    pub division_reasoning: String,
    pub section_codes: Vec<String>,
    pub section_reasoning: String,
    pub full_codes: Vec<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub code_limit_exceeded: bool,
}

/// Result of [`DialogueEngine::run_turn`]
#[derive(Debug, Clone)]
pub struct TurnResult {
    pub outcome: TurnOutcome,
    /// Visible assistant text, without embedded state
    pub message: String,
    /// Listings attached to `message` this turn
    pub disclosed: Vec<TaxonomySlice>,
    pub classification: Option<FinalClassification>,
    pub confirmed_facts: Option<ConfirmedFacts>,
    /// Updated state
    pub state: ConversationState,
    /// `message` with the encoded state appended, ready to store
    pub state_message: String,
    pub warnings: Vec<String>,
}

/// Classification dialogue engine
///
/// Cheap to share behind an `Arc`; holds no per-conversation data.
pub struct DialogueEngine {
    llm: Arc<dyn LlmClient>,
    taxonomy: Arc<TaxonomyStore>,
    config: EngineConfig,
}

impl DialogueEngine {
    /// Engine over the embedded catalog with default settings
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self {
            llm,
            taxonomy: Arc::new(TaxonomyStore::builtin().clone()),
            config: EngineConfig::default(),
        }
    }

    /// Engine with explicit settings, loading `config.catalog_path` if set
    pub fn with_config(
        llm: Arc<dyn LlmClient>,
        config: EngineConfig,
    ) -> std::result::Result<Self, TaxonomyLoadError> {
        let taxonomy = match &config.catalog_path {
            Some(path) => {
                info!(path = %path.display(), "Loading design code catalog");
                TaxonomyStore::from_path(path)?
            }
            None => TaxonomyStore::builtin().clone(),
        };
        Ok(Self {
            llm,
            taxonomy: Arc::new(taxonomy),
            config,
        })
    }

    pub fn with_taxonomy(mut self, taxonomy: Arc<TaxonomyStore>) -> Self {
        self.taxonomy = taxonomy;
        self
    }

    pub fn taxonomy(&self) -> &TaxonomyStore {
        &self.taxonomy
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn llm(&self) -> &Arc<dyn LlmClient> {
        &self.llm
    }

    /// Run one turn for `user_text` against the prior transcript
    pub async fn run_turn(
        &self,
        user_text: &str,
        state: &ConversationState,
        transcript: &[TranscriptMessage],
    ) -> Result<TurnResult> {
        let mut record = DisclosureRecord::compute(transcript);
        for slice in &state.disclosed {
            record.mark(slice);
        }
        let mut next = state.clone();
        let mut warnings = Vec::new();

        let started_element = next.current_element().is_none();
        if started_element {
            let element = next.begin_element(user_text);
            debug!(element_id = %element.id, "Started new design element");
        }

        // Slices issued last turn: point at them, or show them once if the
        // conversation somehow lacks them
        let mut fresh_listings = Vec::new();
        let mut now_available = Vec::new();
        for slice in std::mem::take(&mut next.pending_disclosure) {
            if record.contains(&slice) {
                now_available.push(slice);
            } else if let Some(text) = self.render_slice(&slice) {
                fresh_listings.push(text);
                record.mark(&slice);
                next.record_disclosure(slice);
            }
        }

        let prompt = TurnPrompt {
            store: &self.taxonomy,
            state: &next,
            transcript,
            user_text,
            disclosure: &record,
            fresh_listings,
            now_available,
        }
        .render();

        info!(
            phase = ?state.phase(),
            elements = next.elements.len(),
            disclosed = record.slices().len(),
            provider = self.llm.provider_name(),
            model = self.llm.model_name(),
            "Running classification turn"
        );
        debug!(prompt_len = prompt.len(), "Built classification prompt");

        let raw = self.call_model(&prompt).await?;
        let reply = parse_model_reply(&raw)?;

        let confirmed_facts = reply.confirmed_facts.clone().filter(|f| !f.is_empty());
        if let Some(element) = next.current_element_mut() {
            apply_reply(element, &reply);
        }

        // Listings the model asked for that it has not seen
        let mut fresh = Vec::new();
        for slice in reply.next_step.requested_slices() {
            if record.contains(&slice) {
                warn!(slice = %slice.describe(), "Model requested a listing it already has");
                warnings.push(format!("{} already retrieved", slice.describe()));
            } else if self.render_slice(&slice).is_none() {
                warn!(slice = %slice.describe(), "Model requested an unknown listing");
                warnings.push(format!("{} not found", slice.describe()));
            } else {
                fresh.push(slice);
            }
        }

        // A message after a finished element only opens a new one once the
        // model finds something in it to classify
        if started_element
            && !state.elements.is_empty()
            && reply.next_step.is_empty()
            && next
                .current_element()
                .is_some_and(|e| e.category_code.is_none() && e.confirmed_details.is_empty())
        {
            debug!("Follow-up message did not describe a new element");
            next.elements.pop();
            next.current_element_id = None;
        }

        next.last_request = fresh.last().map(LastRequest::from);

        let (outcome, message, classification) = if !fresh.is_empty() {
            let listings: Vec<String> = fresh
                .iter()
                .filter_map(|slice| self.render_slice(slice))
                .collect();
            let message = attach_listings(&reply.response_to_user, &listings);

            for slice in &fresh {
                next.record_disclosure(slice.clone());
            }
            next.pending_disclosure = fresh.clone();

            info!(
                slices = ?fresh.iter().map(TaxonomySlice::describe).collect::<Vec<_>>(),
                "Disclosing taxonomy listings"
            );
            (TurnOutcome::Researching, message, None)
        } else if let (ReplyStatus::Complete, Some(proposed)) =
            (reply.status, reply.classification.as_ref())
        {
            match self.finalize(&mut next, proposed, &mut warnings)? {
                Some(classification) => {
                    info!(codes = ?classification.full_codes, "Classification complete");
                    (
                        TurnOutcome::Complete,
                        reply.response_to_user.clone(),
                        Some(classification),
                    )
                }
                None => {
                    warn!("Model reported complete without any usable codes");
                    (TurnOutcome::NeedMoreInfo, question_text(&reply), None)
                }
            }
        } else {
            (TurnOutcome::NeedMoreInfo, question_text(&reply), None)
        };

        let state_message = codec::attach(&message, &next);
        debug!(outcome = ?outcome, phase = ?next.phase(), "Turn finished");

        Ok(TurnResult {
            outcome,
            message,
            disclosed: fresh,
            classification,
            confirmed_facts,
            state: next,
            state_message,
            warnings,
        })
    }

    async fn call_model(&self, prompt: &str) -> Result<String> {
        let deadline = self.config.llm_timeout;
        match tokio::time::timeout(deadline, self.llm.chat_json(SYSTEM_PROMPT, prompt)).await {
            Ok(Ok(raw)) => {
                debug!(response_len = raw.len(), "Model replied");
                Ok(raw)
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Generative call failed");
                Err(ClassificationError::ServiceUnavailable(format!("{:#}", e)))
            }
            Err(_) => {
                warn!(seconds = deadline.as_secs(), "Generative call timed out");
                Err(ClassificationError::ServiceTimeout {
                    seconds: deadline.as_secs(),
                })
            }
        }
    }

    fn render_slice(&self, slice: &TaxonomySlice) -> Option<String> {
        match slice {
            TaxonomySlice::Divisions { category } => format_divisions(&self.taxonomy, category),
            TaxonomySlice::Sections { category, division } => {
                format_sections(&self.taxonomy, category, division)
            }
        }
    }

    /// Build final codes for the current element and mark it complete.
    ///
    /// Returns `Ok(None)` when the proposal yields no codes at all.
    fn finalize(
        &self,
        state: &mut ConversationState,
        proposed: &ProposedClassification,
        warnings: &mut Vec<String>,
    ) -> Result<Option<FinalClassification>> {
        let Some(element) = state.current_element_mut() else {
            return Ok(None);
        };

        let mut full_codes = self.cross_product(element)?;
        for code in &proposed.full_codes {
            let code = parse_full_code(code)?;
            if !full_codes.contains(&code) {
                full_codes.push(code);
            }
        }
        if full_codes.is_empty() {
            return Ok(None);
        }

        let max = self.config.max_codes;
        let mut code_limit_exceeded = false;
        if full_codes.len() > max {
            code_limit_exceeded = true;
            let count = full_codes.len();
            match self.config.limit_policy {
                CodeLimitPolicy::Flag => {
                    warn!(count, max, "Classification exceeds the code limit");
                }
                CodeLimitPolicy::Truncate => {
                    warn!(count, max, "Truncating classification to the code limit");
                    full_codes.truncate(max);
                }
                CodeLimitPolicy::Reject => {
                    return Err(ClassificationError::CodeLimitExceeded { count, limit: max });
                }
            }
            warnings.push(format!(
                "Classification names {} codes, the guideline is at most {}",
                count, max
            ));
        }

        element.complete(full_codes.clone());
        let classification = FinalClassification {
            category_code: element.category_code.clone().unwrap_or_default(),
            category_reasoning: element.category_reasoning.clone().unwrap_or_default(),
            division_codes: element.division_codes.clone(),
            division_reasoning: element.division_reasoning.clone().unwrap_or_default(),
            section_codes: element.section_codes.clone(),
            section_reasoning: element.section_reasoning.clone().unwrap_or_default(),
            full_codes,
            code_limit_exceeded,
        };
        state.current_element_id = None;
        Ok(Some(classification))
    }

    /// Category × divisions × sections, keeping only combinations the
    /// catalog knows when it lists sections for that division
    fn cross_product(&self, element: &DesignElement) -> Result<Vec<String>> {
        let Some(category) = element.category_code.as_deref() else {
            return Ok(Vec::new());
        };

        let mut codes = Vec::new();
        for division in &element.division_codes {
            let known = self.taxonomy.get_sections(category, division);
            for section in &element.section_codes {
                let code = finalize_full_code(category, division, section)?;
                let listed = known.is_empty() || known.iter().any(|s| &s.code == section);
                if listed && !codes.contains(&code) {
                    codes.push(code);
                }
            }
        }
        Ok(codes)
    }
}

/// Fold the model's partial classification and facts into the element.
///
/// Codes that fail the digit check are skipped here; finalization rejects
/// them where they matter.
fn apply_reply(element: &mut DesignElement, reply: &ModelReply) {
    if let Some(facts) = &reply.confirmed_facts {
        element.confirmed_details.merge(facts);
    }

    let Some(proposed) = &reply.classification else {
        return;
    };

    if let Ok(category) = normalize_part(bare(&proposed.category_code), CodeLevel::Category) {
        if element.category_code.as_deref() != Some(category.as_str()) {
            if element.category_code.is_some() {
                debug!(from = ?element.category_code, to = %category, "Category changed");
            }
            // Divisions and sections only make sense under their category
            element.division_codes.clear();
            element.section_codes.clear();
            element.category_code = Some(category);
        }
    }
    set_text(&mut element.category_reasoning, &proposed.category_reasoning);

    if element.category_code.is_some() {
        let divisions = normalized(&proposed.division_codes, CodeLevel::Division);
        if !divisions.is_empty() {
            element.select_divisions(divisions);
        }
        set_text(&mut element.division_reasoning, &proposed.division_reasoning);

        let sections = normalized(&proposed.section_codes, CodeLevel::Section);
        if !sections.is_empty() {
            element.section_codes = sections;
        }
        set_text(&mut element.section_reasoning, &proposed.section_reasoning);
    }
}

/// Last dotted component: `"01.07"` → `"07"`
fn bare(code: &str) -> &str {
    code.rsplit('.').next().unwrap_or(code)
}

fn normalized(codes: &[String], level: CodeLevel) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for code in codes {
        match normalize_part(bare(code), level) {
            Ok(code) if !out.contains(&code) => out.push(code),
            Ok(_) => {}
            Err(e) => warn!(code = %code, error = %e, "Skipping malformed code"),
        }
    }
    out
}

fn set_text(field: &mut Option<String>, value: &str) {
    if !value.trim().is_empty() {
        *field = Some(value.to_string());
    }
}

fn attach_listings(response: &str, listings: &[String]) -> String {
    let body = listings
        .iter()
        .map(|l| l.trim_end())
        .collect::<Vec<_>>()
        .join("\n\n");
    if response.trim().is_empty() {
        body
    } else {
        format!("{}{}{}", response.trim_end(), LISTING_SEPARATOR, body)
    }
}

fn question_text(reply: &ModelReply) -> String {
    if reply.response_to_user.trim().is_empty() {
        FALLBACK_QUESTION.to_string()
    } else {
        reply.response_to_user.clone()
    }
}
