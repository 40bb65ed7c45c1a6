//! Model reply parsing
//!
//! The model answers every turn with one JSON object, sometimes wrapped in a
//! Markdown code fence. Parsing is strict about two things only: the text
//! must be JSON, and it must carry a `nextStep` object.

use regex::Regex;
use serde::{Deserialize, Deserializer};
use std::sync::LazyLock;
use tracing::{debug, warn};

use super::state::{ConfirmedFacts, TaxonomySlice};
use crate::error::ClassificationError;
use crate::taxonomy::{normalize_part, CodeLevel};

static CODE_FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```[A-Za-z]*\s*(.*?)\s*```").unwrap());

/// Treat JSON `null` like a missing field
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A field the model sometimes sends as a single value and sometimes as a list
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(value) => vec![value],
            OneOrMany::Many(values) => values,
        }
    }

    pub fn as_slice(&self) -> &[T] {
        match self {
            OneOrMany::One(value) => std::slice::from_ref(value),
            OneOrMany::Many(values) => values,
        }
    }
}

/// Whether the model considers the classification finished
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyStatus {
    #[default]
    Researching,
    Complete,
}

/// Level the model says it is working on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassificationStep {
    Category,
    Division,
    Section,
}

/// `{category, division}` pair inside `requestSectionsFor`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SectionRequest {
    #[serde(default, deserialize_with = "nullable")]
    pub category: String,
    #[serde(default, deserialize_with = "nullable")]
    pub division: String,
}

/// What the model wants to see before its next answer
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextStep {
    #[serde(default, deserialize_with = "nullable")]
    pub request_category_list: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub request_divisions_for: OneOrMany<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub request_sections_for: OneOrMany<SectionRequest>,
}

impl NextStep {
    /// Requested listings with codes normalized to two digits, in request
    /// order, without duplicates. Malformed codes are dropped.
    pub fn requested_slices(&self) -> Vec<TaxonomySlice> {
        let mut slices: Vec<TaxonomySlice> = Vec::new();

        for raw in self.request_divisions_for.as_slice() {
            match normalize_part(raw, CodeLevel::Category) {
                Ok(category) => push_unique(&mut slices, TaxonomySlice::divisions(category)),
                Err(e) => warn!(code = %raw, error = %e, "Ignoring malformed division request"),
            }
        }

        for request in self.request_sections_for.as_slice() {
            let category = normalize_part(&request.category, CodeLevel::Category);
            let division = normalize_part(
                bare_division(&request.category, &request.division),
                CodeLevel::Division,
            );
            match (category, division) {
                (Ok(category), Ok(division)) => {
                    push_unique(&mut slices, TaxonomySlice::sections(category, division))
                }
                _ => warn!(
                    category = %request.category,
                    division = %request.division,
                    "Ignoring malformed section request"
                ),
            }
        }

        slices
    }

    pub fn is_empty(&self) -> bool {
        self.request_divisions_for.as_slice().is_empty()
            && self.request_sections_for.as_slice().is_empty()
    }
}

/// Accept `"01.07"` where a bare `"07"` was asked for, when the prefix matches
fn bare_division<'a>(category: &str, division: &'a str) -> &'a str {
    match division.split_once('.') {
        Some((prefix, bare)) if prefix.trim_start_matches('0') == category.trim_start_matches('0') => {
            bare
        }
        _ => division,
    }
}

fn push_unique(slices: &mut Vec<TaxonomySlice>, slice: TaxonomySlice) {
    if !slices.contains(&slice) {
        slices.push(slice);
    }
}

/// Classification as proposed by the model, before validation
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposedClassification {
    #[serde(default, deserialize_with = "nullable")]
    pub category_code: String,
    #[serde(default, deserialize_with = "nullable")]
    pub category_reasoning: String,
    #[serde(default, deserialize_with = "nullable")]
    pub division_codes: Vec<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub division_reasoning: String,
    #[serde(default, deserialize_with = "nullable")]
    pub section_codes: Vec<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub section_reasoning: String,
    #[serde(default, deserialize_with = "nullable")]
    pub full_codes: Vec<String>,
}

/// One structured model reply
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelReply {
    #[serde(default, deserialize_with = "nullable")]
    pub status: ReplyStatus,
    #[serde(default)]
    pub current_step: Option<ClassificationStep>,
    #[serde(default, deserialize_with = "nullable")]
    pub reasoning: String,
    #[serde(default, deserialize_with = "nullable")]
    pub response_to_user: String,
    #[serde(default)]
    pub confirmed_facts: Option<ConfirmedFacts>,
    #[serde(default)]
    pub classification: Option<ProposedClassification>,
    pub next_step: NextStep,
}

/// Remove Markdown code fences around the payload
pub fn strip_code_fences(text: &str) -> String {
    CODE_FENCE_RE.replace_all(text, "$1").trim().to_string()
}

/// Parse raw model text into a [`ModelReply`]
pub fn parse_model_reply(raw: &str) -> Result<ModelReply, ClassificationError> {
    let sanitized = strip_code_fences(raw);

    let value = parse_json_object(&sanitized).ok_or_else(|| {
        warn!(raw_len = raw.len(), "Model reply is not a JSON object");
        ClassificationError::MalformedModelOutput {
            message: "Failed to parse AI response as JSON".to_string(),
            raw: raw.to_string(),
        }
    })?;

    match value.get("nextStep") {
        Some(next) if !next.is_null() => {}
        _ => return Err(ClassificationError::MissingNextStep),
    }

    let reply: ModelReply =
        serde_json::from_value(value).map_err(|e| ClassificationError::MalformedModelOutput {
            message: format!("Unexpected reply structure: {}", e),
            raw: raw.to_string(),
        })?;

    debug!(
        status = ?reply.status,
        step = ?reply.current_step,
        requested = reply.next_step.requested_slices().len(),
        has_classification = reply.classification.is_some(),
        response_len = reply.response_to_user.len(),
        "Parsed model reply"
    );

    Ok(reply)
}

/// Parse the whole text as an object, or failing that the outermost braces
fn parse_json_object(text: &str) -> Option<serde_json::Value> {
    let parsed = serde_json::from_str::<serde_json::Value>(text)
        .ok()
        .or_else(|| {
            let start = text.find('{')?;
            let end = text.rfind('}')?;
            (start < end)
                .then(|| serde_json::from_str(&text[start..=end]).ok())
                .flatten()
        })?;
    parsed.is_object().then_some(parsed)
}
