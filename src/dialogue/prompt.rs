//! Prompt assembly for one classification turn
//!
//! The system prompt is static. The user prompt is rebuilt each turn from the
//! category listing, any slice text due this turn, the visible conversation,
//! and the current element's progress.

use std::fmt::Write;

use super::codec::strip_state;
use super::disclosure::DisclosureRecord;
use super::state::{ConversationState, DesignElement, TaxonomySlice, TranscriptMessage};
use crate::taxonomy::{division_label, dotted, format_categories, TaxonomyStore};

/// Fixed policy and response schema
pub const SYSTEM_PROMPT: &str = include_str!("prompts/design_code_system.md");

/// Everything that goes into the user prompt of one turn
pub struct TurnPrompt<'a> {
    pub store: &'a TaxonomyStore,
    pub state: &'a ConversationState,
    pub transcript: &'a [TranscriptMessage],
    pub user_text: &'a str,
    pub disclosure: &'a DisclosureRecord,
    /// Full listings placed in this prompt, already rendered
    pub fresh_listings: Vec<String>,
    /// Slices requested last turn that are already in the conversation
    pub now_available: Vec<TaxonomySlice>,
}

impl<'a> TurnPrompt<'a> {
    pub fn render(&self) -> String {
        let mut out = format_categories(self.store);

        for listing in &self.fresh_listings {
            out.push('\n');
            out.push_str(listing);
        }

        if !self.now_available.is_empty() {
            let _ = write!(
                out,
                "\nREQUESTED DATA NOW AVAILABLE:\nThe listings you asked for are in the conversation below ({}). Use them to continue.\n",
                describe_slices(&self.now_available)
            );
        }

        if !self.disclosure.is_empty() {
            let _ = write!(
                out,
                "\nALREADY RETRIEVED (do not request again): {}\n",
                describe_slices(&self.disclosure.slices())
            );
        }

        let _ = write!(
            out,
            "\nCONVERSATION HISTORY:\n{}\nThe user's latest input: \"{}\"\n\nCURRENT PROGRESS:\n{}",
            format_history(self.transcript),
            self.user_text,
            format_progress(self.state)
        );

        if let Some(details) = self
            .state
            .current_element()
            .and_then(format_confirmed_details)
        {
            out.push('\n');
            out.push_str(&details);
        }

        out
    }
}

/// `ROLE: content` blocks with every embedded state removed
pub fn format_history(transcript: &[TranscriptMessage]) -> String {
    let mut out = String::new();
    for message in transcript {
        let _ = write!(
            out,
            "{}: {}\n\n",
            message.role.as_upper(),
            strip_state(&message.content)
        );
    }
    out
}

/// One line per element with its codes or classification status
pub fn format_progress(state: &ConversationState) -> String {
    if state.elements.is_empty() {
        return "- No design elements yet\n".to_string();
    }

    let mut out = String::new();
    for element in &state.elements {
        let _ = writeln!(out, "- {}: {}", element.description, progress_line(element));
    }
    out
}

fn progress_line(element: &DesignElement) -> String {
    if element.completed {
        let codes: Vec<String> = element.full_codes.iter().map(|c| dotted(c)).collect();
        return format!("Classified with codes: {}", codes.join(", "));
    }
    match &element.category_code {
        Some(category) if !element.division_codes.is_empty() => {
            let divisions: Vec<String> = element
                .division_codes
                .iter()
                .map(|d| division_label(category, d))
                .collect();
            format!(
                "In progress, category {}, divisions {}",
                category,
                divisions.join(", ")
            )
        }
        Some(category) => format!("In progress, category {}", category),
        None => "Not yet classified".to_string(),
    }
}

fn format_confirmed_details(element: &DesignElement) -> Option<String> {
    let entries = element.confirmed_details.entries();
    if entries.is_empty() {
        return None;
    }
    let mut out = String::from("CONFIRMED DETAILS (DO NOT RE-ASK ABOUT THESE):\n");
    for (label, values) in entries {
        let _ = writeln!(out, "- {}: {}", label, values.join(", "));
    }
    Some(out)
}

fn describe_slices(slices: &[TaxonomySlice]) -> String {
    slices
        .iter()
        .map(TaxonomySlice::describe)
        .collect::<Vec<_>>()
        .join("; ")
}
