//! Slice rendering
//!
//! Turns catalog slices into the plain-text blocks placed in model prompts
//! and disclosure messages. Each block opens with a fixed header so later
//! turns can recognise what has already been shown.

use std::fmt::Write;

use super::node::{Division, Section};
use super::store::TaxonomyStore;

/// Header prefix of a division listing, followed by the category code
pub const DIVISIONS_MARKER: &str = "AVAILABLE DIVISIONS FOR CATEGORY";

/// Header prefix of a section listing, followed by `CC.DD`
pub const SECTIONS_MARKER: &str = "AVAILABLE SECTIONS FOR DIVISION";

/// Header of the always-present category listing
pub const CATEGORIES_HEADER: &str = "AVAILABLE CATEGORIES:";

/// Category listing, one `CC: description` line per category
pub fn format_categories(store: &TaxonomyStore) -> String {
    let mut out = String::from(CATEGORIES_HEADER);
    out.push('\n');
    for category in store.get_categories() {
        let _ = writeln!(out, "{}: {}", category.code, category.description);
    }
    out
}

/// Division listing for one category, or `None` when the category has none
pub fn format_divisions(store: &TaxonomyStore, category: &str) -> Option<String> {
    let divisions = store.get_divisions(category);
    if divisions.is_empty() {
        return None;
    }

    let mut out = String::new();
    match store.category(category) {
        Some(c) => {
            let _ = writeln!(out, "{} {} ({}):", DIVISIONS_MARKER, category, c.description);
        }
        None => {
            let _ = writeln!(out, "{} {}:", DIVISIONS_MARKER, category);
        }
    }
    for division in divisions {
        write_division(&mut out, division);
    }
    Some(out)
}

/// Section listing for one (category, division) pair, or `None` when empty
pub fn format_sections(store: &TaxonomyStore, category: &str, division: &str) -> Option<String> {
    let sections = store.get_sections(category, division);
    if sections.is_empty() {
        return None;
    }

    let mut out = String::new();
    match store.division(category, division) {
        Some(d) => {
            let _ = writeln!(
                out,
                "{} {}.{} ({}):",
                SECTIONS_MARKER, category, division, d.description
            );
        }
        None => {
            let _ = writeln!(out, "{} {}.{}:", SECTIONS_MARKER, category, division);
        }
    }
    for section in sections {
        write_section(&mut out, section);
    }
    Some(out)
}

fn write_division(out: &mut String, division: &Division) {
    let _ = writeln!(out, "{}: {}", division.label(), division.description);
    write_guidance(out, &division.guidelines, &division.excludes);
}

fn write_section(out: &mut String, section: &Section) {
    let _ = writeln!(out, "  - {}: {}", section.label(), section.description);
    write_guidance(out, &section.guidelines, &section.excludes);
}

fn write_guidance(out: &mut String, guidelines: &[String], excludes: &[String]) {
    for guideline in guidelines {
        let _ = writeln!(out, "    * {}", guideline);
    }
    if !excludes.is_empty() {
        out.push_str("    Excludes:\n");
        for exclude in excludes {
            let _ = writeln!(out, "    * {}", exclude);
        }
    }
}
