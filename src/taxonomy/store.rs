//! Taxonomy Store
//!
//! Static, read-only design code catalog. Loaded once per process and shared
//! by reference; every lookup is a total function where an unknown code simply
//! yields an empty slice.

use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::LazyLock;
use thiserror::Error;

use super::codes::{normalize_part, CodeLevel};
use super::node::{Category, Division, Section, TaxonomyNode};

const EMBEDDED_CATALOG: &str = include_str!("data/design_codes.json");

static BUILTIN: LazyLock<TaxonomyStore> = LazyLock::new(|| {
    TaxonomyStore::from_json(EMBEDDED_CATALOG).expect("embedded design code catalog is valid")
});

/// Catalog load failures
#[derive(Debug, Error)]
pub enum TaxonomyLoadError {
    #[error("Catalog JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Catalog IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed {level} code '{code}' in catalog")]
    MalformedCode { level: CodeLevel, code: String },

    #[error("Division {category}.{division} references unknown category")]
    OrphanDivision { category: String, division: String },

    #[error("Section {category}.{division}.{section} references unknown division")]
    OrphanSection {
        category: String,
        division: String,
        section: String,
    },

    #[error("Duplicate code '{0}' in catalog")]
    Duplicate(String),
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    categories: Vec<Category>,
    #[serde(default)]
    divisions: Vec<Division>,
    #[serde(default)]
    sections: Vec<Section>,
}

/// Three-level design code catalog
#[derive(Debug, Clone, Default)]
pub struct TaxonomyStore {
    categories: Vec<Category>,
    divisions: BTreeMap<String, Vec<Division>>,
    sections: BTreeMap<(String, String), Vec<Section>>,
}

impl TaxonomyStore {
    /// The catalog compiled into the binary
    pub fn builtin() -> &'static TaxonomyStore {
        &BUILTIN
    }

    /// Load a catalog from a JSON file with `categories`, `divisions`, `sections`
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, TaxonomyLoadError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Parse and validate a catalog.
    ///
    /// Every division's category and every section's (category, division)
    /// pair must exist; codes must be two digits.
    pub fn from_json(json: &str) -> Result<Self, TaxonomyLoadError> {
        let file: CatalogFile = serde_json::from_str(json)?;
        let mut store = TaxonomyStore::default();
        let mut seen = HashSet::new();

        for category in file.categories {
            check_code(&category.code, CodeLevel::Category)?;
            if !seen.insert(category.code.clone()) {
                return Err(TaxonomyLoadError::Duplicate(category.code));
            }
            store.categories.push(category);
        }
        store.categories.sort_by(|a, b| a.code.cmp(&b.code));

        for division in file.divisions {
            check_code(&division.code, CodeLevel::Division)?;
            if !store.has_category(&division.category) {
                return Err(TaxonomyLoadError::OrphanDivision {
                    category: division.category,
                    division: division.code,
                });
            }
            if !seen.insert(division.label()) {
                return Err(TaxonomyLoadError::Duplicate(division.label()));
            }
            store
                .divisions
                .entry(division.category.clone())
                .or_default()
                .push(division);
        }

        for section in file.sections {
            check_code(&section.code, CodeLevel::Section)?;
            if store.division(&section.category, &section.division).is_none() {
                return Err(TaxonomyLoadError::OrphanSection {
                    category: section.category,
                    division: section.division,
                    section: section.code,
                });
            }
            if !seen.insert(section.label()) {
                return Err(TaxonomyLoadError::Duplicate(section.label()));
            }
            store
                .sections
                .entry((section.category.clone(), section.division.clone()))
                .or_default()
                .push(section);
        }

        for list in store.divisions.values_mut() {
            list.sort_by(|a, b| a.code.cmp(&b.code));
        }
        for list in store.sections.values_mut() {
            list.sort_by(|a, b| a.code.cmp(&b.code));
        }

        tracing::debug!(
            categories = store.categories.len(),
            divisions = store.divisions.values().map(Vec::len).sum::<usize>(),
            sections = store.sections.values().map(Vec::len).sum::<usize>(),
            "Design code catalog loaded"
        );

        Ok(store)
    }

    // =========================================================================
    // LOOKUP
    // =========================================================================

    /// All categories in code order
    pub fn get_categories(&self) -> &[Category] {
        &self.categories
    }

    /// Divisions of a category; empty for unknown codes
    pub fn get_divisions(&self, category: &str) -> &[Division] {
        self.divisions
            .get(category)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Sections of a (category, division) pair; empty for unknown codes
    pub fn get_sections(&self, category: &str, division: &str) -> &[Section] {
        self.sections
            .get(&(category.to_string(), division.to_string()))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn category(&self, code: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.code == code)
    }

    pub fn division(&self, category: &str, division: &str) -> Option<&Division> {
        self.get_divisions(category)
            .iter()
            .find(|d| d.code == division)
    }

    pub fn section(&self, category: &str, division: &str, section: &str) -> Option<&Section> {
        self.get_sections(category, division)
            .iter()
            .find(|s| s.code == section)
    }

    pub fn has_category(&self, code: &str) -> bool {
        self.category(code).is_some()
    }

    /// Look up any node by `CC`, `CC.DD`, `CC.DD.SS` or the compact `CCDDSS`
    pub fn find(&self, code: &str) -> Option<TaxonomyNode<'_>> {
        let code = code.trim();
        let parts: Vec<&str> = if code.contains('.') {
            code.split('.').collect()
        } else if code.is_ascii() && code.len() % 2 == 0 && code.len() <= 6 {
            (0..code.len()).step_by(2).map(|i| &code[i..i + 2]).collect()
        } else {
            return None;
        };

        match parts.as_slice() {
            [c] => self.category(c).map(TaxonomyNode::Category),
            [c, d] => self.division(c, d).map(TaxonomyNode::Division),
            [c, d, s] => self.section(c, d, s).map(TaxonomyNode::Section),
            _ => None,
        }
    }

    /// Human-readable description of a dotted full code:
    /// `01.01.03 - {category; division; section}`
    pub fn describe_code(&self, code: &str) -> String {
        let mut parts = code.split('.');
        let (Some(c), Some(d), Some(s)) = (parts.next(), parts.next(), parts.next()) else {
            return "Invalid design code format".to_string();
        };
        if c.is_empty() || d.is_empty() || s.is_empty() {
            return "Invalid design code format".to_string();
        }

        match (
            self.category(c),
            self.division(c, d),
            self.section(c, d, s),
        ) {
            (Some(category), Some(division), Some(section)) => format!(
                "{} - {{{}; {}; {}}}",
                code, category.description, division.description, section.description
            ),
            _ => "Design code not found".to_string(),
        }
    }
}

fn check_code(code: &str, level: CodeLevel) -> Result<(), TaxonomyLoadError> {
    match normalize_part(code, level) {
        Ok(normalized) if normalized == code => Ok(()),
        _ => Err(TaxonomyLoadError::MalformedCode {
            level,
            code: code.to_string(),
        }),
    }
}
