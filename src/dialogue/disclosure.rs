//! Disclosure Tracker
//!
//! Works out which taxonomy listings the model has already been shown, so a
//! listing is disclosed at most once per conversation.
//!
//! Three sources are combined:
//! - receipts recorded in the embedded [`ConversationState`]
//! - listing blocks the engine appended to assistant messages
//! - marker headers found in user-role messages, which is how older
//!   transcripts without receipts recorded disclosures
//!
//! Assistant prose is never mined, only the block after
//! [`LISTING_SEPARATOR`] or a message that is a bare listing.
//!
//! The result is a pure function of the transcript.

use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use super::codec;
use super::state::{Role, TaxonomySlice, TranscriptMessage};
use crate::taxonomy::{normalize_part, CodeLevel, DIVISIONS_MARKER, SECTIONS_MARKER};

/// Separates the model's reply from appended listings
pub(crate) const LISTING_SEPARATOR: &str = "\n\n---\n\n";

/// `AVAILABLE DIVISIONS FOR CATEGORY 01`
static DIVISIONS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"AVAILABLE DIVISIONS FOR CATEGORY (\d{1,2})\b").unwrap());

/// `AVAILABLE SECTIONS FOR DIVISION 01.01`
static SECTIONS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"AVAILABLE SECTIONS FOR DIVISION (\d{1,2})\.(\d{1,2})\b").unwrap()
});

/// Listings already shown to the model
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisclosureRecord {
    /// Categories whose division listing was shown
    pub retrieved_divisions: BTreeSet<String>,
    /// Category → divisions whose section listing was shown
    pub retrieved_sections: BTreeMap<String, BTreeSet<String>>,
}

impl DisclosureRecord {
    /// Scan a transcript for receipts and legacy markers
    pub fn compute(transcript: &[TranscriptMessage]) -> Self {
        let mut record = DisclosureRecord::default();

        for message in transcript {
            match message.role {
                Role::User => record.mine_markers(&message.content),
                Role::Assistant => {
                    if let Some(listings) = listing_block(&message.content) {
                        record.mine_markers(listings);
                    }
                }
            }
        }

        // A corrupt payload contributes no receipts; the codec reports it
        if let Ok(Some(state)) = codec::try_decode(transcript) {
            for slice in &state.disclosed {
                record.mark(slice);
            }
        }

        record
    }

    /// Record marker headers found in free text
    pub fn mine_markers(&mut self, text: &str) {
        for caps in DIVISIONS_RE.captures_iter(text) {
            if let Ok(category) = normalize_part(&caps[1], CodeLevel::Category) {
                self.retrieved_divisions.insert(category);
            }
        }
        for caps in SECTIONS_RE.captures_iter(text) {
            let category = normalize_part(&caps[1], CodeLevel::Category);
            let division = normalize_part(&caps[2], CodeLevel::Division);
            if let (Ok(category), Ok(division)) = (category, division) {
                self.retrieved_sections
                    .entry(category)
                    .or_default()
                    .insert(division);
            }
        }
    }

    pub fn mark(&mut self, slice: &TaxonomySlice) {
        match slice {
            TaxonomySlice::Divisions { category } => {
                self.retrieved_divisions.insert(category.clone());
            }
            TaxonomySlice::Sections { category, division } => {
                self.retrieved_sections
                    .entry(category.clone())
                    .or_default()
                    .insert(division.clone());
            }
        }
    }

    pub fn has_divisions(&self, category: &str) -> bool {
        self.retrieved_divisions.contains(category)
    }

    pub fn has_sections(&self, category: &str, division: &str) -> bool {
        self.retrieved_sections
            .get(category)
            .is_some_and(|divisions| divisions.contains(division))
    }

    pub fn contains(&self, slice: &TaxonomySlice) -> bool {
        match slice {
            TaxonomySlice::Divisions { category } => self.has_divisions(category),
            TaxonomySlice::Sections { category, division } => {
                self.has_sections(category, division)
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.retrieved_divisions.is_empty() && self.retrieved_sections.is_empty()
    }

    /// Every recorded slice, divisions first, in code order
    pub fn slices(&self) -> Vec<TaxonomySlice> {
        let divisions = self
            .retrieved_divisions
            .iter()
            .map(|c| TaxonomySlice::divisions(c.as_str()));
        let sections = self.retrieved_sections.iter().flat_map(|(category, divisions)| {
            divisions
                .iter()
                .map(move |d| TaxonomySlice::sections(category.as_str(), d.as_str()))
        });
        divisions.chain(sections).collect()
    }
}

/// The appended listing block of an assistant message, if it has one
fn listing_block(content: &str) -> Option<&str> {
    let visible = codec::strip_state(content);
    let block = match visible.rsplit_once(LISTING_SEPARATOR) {
        Some((_, tail)) => tail,
        None => visible,
    }
    .trim_start();
    (block.starts_with(DIVISIONS_MARKER) || block.starts_with(SECTIONS_MARKER)).then_some(block)
}

/// Compute the disclosure record of a transcript
pub fn compute_disclosure(transcript: &[TranscriptMessage]) -> DisclosureRecord {
    DisclosureRecord::compute(transcript)
}
