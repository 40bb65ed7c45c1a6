//! Conversation state
//!
//! The state of a classification dialogue travels inside the transcript (see
//! [`super::codec`]), so every type here serializes to the camelCase JSON the
//! chat UI already stores.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::taxonomy::division_label;

// ============================================================================
// Transcript
// ============================================================================

/// Speaker of a transcript message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_upper(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Assistant => "ASSISTANT",
        }
    }
}

/// One chat message, oldest first within a transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptMessage {
    pub role: Role,
    pub content: String,
}

impl TranscriptMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

// ============================================================================
// Taxonomy slices
// ============================================================================

/// A listing that can be disclosed to the model: every division of a
/// category, or every section of a (category, division) pair.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaxonomySlice {
    Divisions {
        category: String,
    },
    Sections {
        category: String,
        division: String,
    },
}

impl TaxonomySlice {
    pub fn divisions(category: impl Into<String>) -> Self {
        TaxonomySlice::Divisions {
            category: category.into(),
        }
    }

    pub fn sections(category: impl Into<String>, division: impl Into<String>) -> Self {
        TaxonomySlice::Sections {
            category: category.into(),
            division: division.into(),
        }
    }

    pub fn category(&self) -> &str {
        match self {
            TaxonomySlice::Divisions { category } | TaxonomySlice::Sections { category, .. } => {
                category
            }
        }
    }

    /// `divisions for 01` / `sections for 01.01`, for logs
    pub fn describe(&self) -> String {
        match self {
            TaxonomySlice::Divisions { category } => format!("divisions for {}", category),
            TaxonomySlice::Sections { category, division } => {
                format!("sections for {}", division_label(category, division))
            }
        }
    }
}

/// Level of the most recent disclosure request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    Division,
    Section,
}

/// The most recent disclosure request issued on behalf of the model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastRequest {
    #[serde(rename = "type")]
    pub kind: RequestKind,
    pub category_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub division_code: Option<String>,
}

impl From<&TaxonomySlice> for LastRequest {
    fn from(slice: &TaxonomySlice) -> Self {
        match slice {
            TaxonomySlice::Divisions { category } => LastRequest {
                kind: RequestKind::Division,
                category_code: category.clone(),
                division_code: None,
            },
            TaxonomySlice::Sections { category, division } => LastRequest {
                kind: RequestKind::Section,
                category_code: category.clone(),
                division_code: Some(division.clone()),
            },
        }
    }
}

// ============================================================================
// Confirmed facts
// ============================================================================

/// Facts the model has confirmed with the user, as reported each turn
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmedFacts {
    #[serde(default)]
    pub shapes: Vec<String>,
    #[serde(default)]
    pub arrangement: Vec<String>,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub other_details: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

impl ConfirmedFacts {
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
            && self.arrangement.is_empty()
            && self.colors.is_empty()
            && self.other_details.is_empty()
    }
}

/// Per-element record of confirmed visual details
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmedDetails {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub shape: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arrangement: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub color: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub other_elements: Vec<String>,
}

impl ConfirmedDetails {
    /// Replace each list the model reported; lists it left empty are kept
    pub fn merge(&mut self, facts: &ConfirmedFacts) {
        if !facts.shapes.is_empty() {
            self.shape = facts.shapes.clone();
        }
        if !facts.arrangement.is_empty() {
            self.arrangement = facts.arrangement.clone();
        }
        if !facts.colors.is_empty() {
            self.color = facts.colors.clone();
        }
        if !facts.other_details.is_empty() {
            self.other_elements = facts.other_details.clone();
        }
    }

    /// Non-empty `(label, values)` pairs in display order
    pub fn entries(&self) -> Vec<(&'static str, &[String])> {
        [
            ("shape", self.shape.as_slice()),
            ("arrangement", self.arrangement.as_slice()),
            ("color", self.color.as_slice()),
            ("other elements", self.other_elements.as_slice()),
        ]
        .into_iter()
        .filter(|(_, values)| !values.is_empty())
        .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

// ============================================================================
// Design elements
// ============================================================================

/// One figurative element the user is describing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignElement {
    pub id: String,
    pub description: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_reasoning: Option<String>,
    /// Bare two-digit codes under `category_code`, unique, in selection order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub division_codes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub division_reasoning: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub section_codes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_reasoning: Option<String>,
    /// Six-digit codes; only populated once `completed`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub full_codes: Vec<String>,
    #[serde(default, skip_serializing_if = "ConfirmedDetails::is_empty")]
    pub confirmed_details: ConfirmedDetails,
}

impl DesignElement {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            description: description.into(),
            completed: false,
            category_code: None,
            category_reasoning: None,
            division_codes: Vec::new(),
            division_reasoning: None,
            section_codes: Vec::new(),
            section_reasoning: None,
            full_codes: Vec::new(),
            confirmed_details: ConfirmedDetails::default(),
        }
    }

    /// Replace the selected divisions, keeping the first occurrence of each code
    pub fn select_divisions(&mut self, codes: impl IntoIterator<Item = String>) {
        self.division_codes.clear();
        for code in codes {
            if !self.division_codes.contains(&code) {
                self.division_codes.push(code);
            }
        }
    }

    /// Mark the element classified with its final full codes
    pub fn complete(&mut self, full_codes: Vec<String>) {
        self.completed = !full_codes.is_empty();
        self.full_codes = full_codes;
    }
}

// ============================================================================
// Conversation state
// ============================================================================

/// Where a conversation stands in the classification protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialoguePhase {
    AwaitingCategory,
    AwaitingDivisionData,
    AwaitingSectionData,
    Refining,
    Complete,
}

/// State carried across turns inside the transcript
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationState {
    #[serde(default)]
    pub elements: Vec<DesignElement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_element_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_request: Option<LastRequest>,
    /// Slices issued in the previous turn, awaiting the model's next look
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pending_disclosure: Vec<TaxonomySlice>,
    /// Receipts for every slice already shown to the model
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub disclosed: Vec<TaxonomySlice>,
}

impl ConversationState {
    pub fn current_element(&self) -> Option<&DesignElement> {
        let id = self.current_element_id.as_deref()?;
        self.elements.iter().find(|e| e.id == id)
    }

    pub fn current_element_mut(&mut self) -> Option<&mut DesignElement> {
        let id = self.current_element_id.clone()?;
        self.elements.iter_mut().find(|e| e.id == id)
    }

    /// Start tracking a new element and make it current
    pub fn begin_element(&mut self, description: impl Into<String>) -> &mut DesignElement {
        let element = DesignElement::new(description);
        self.current_element_id = Some(element.id.clone());
        self.elements.push(element);
        let last = self.elements.len() - 1;
        &mut self.elements[last]
    }

    /// Record that a slice has been shown; receipts stay unique
    pub fn record_disclosure(&mut self, slice: TaxonomySlice) {
        if !self.disclosed.contains(&slice) {
            self.disclosed.push(slice);
        }
    }

    /// Derive the protocol phase from the stored fields
    pub fn phase(&self) -> DialoguePhase {
        if self
            .pending_disclosure
            .iter()
            .any(|s| matches!(s, TaxonomySlice::Sections { .. }))
        {
            return DialoguePhase::AwaitingSectionData;
        }
        if !self.pending_disclosure.is_empty() {
            return DialoguePhase::AwaitingDivisionData;
        }
        match self.current_element() {
            Some(element) if element.category_code.is_some() => DialoguePhase::Refining,
            Some(_) => DialoguePhase::AwaitingCategory,
            None if self.elements.last().is_some_and(|e| e.completed) => DialoguePhase::Complete,
            None => DialoguePhase::AwaitingCategory,
        }
    }
}
