//! Taxonomy nodes
//!
//! Three nested levels: category → division → section. Divisions and sections
//! carry their parent codes so a bare two-digit code is never interpreted
//! outside its parent.

use serde::{Deserialize, Serialize};

use super::codes::division_label;

/// Top level of the design code taxonomy (e.g. `01` Celestial bodies)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub code: String,
    pub description: String,
}

/// Second level, scoped to a category (e.g. `01.01` Stars, comets)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Division {
    /// Parent category code
    pub category: String,
    /// Two-digit division code, without the category prefix
    pub code: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub guidelines: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excludes: Vec<String>,
}

impl Division {
    /// `CC.DD`
    pub fn label(&self) -> String {
        division_label(&self.category, &self.code)
    }
}

/// Leaf level, scoped to a (category, division) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub category: String,
    pub division: String,
    /// Two-digit section code
    pub code: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub guidelines: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excludes: Vec<String>,
}

impl Section {
    /// `CC.DD.SS`
    pub fn label(&self) -> String {
        format!("{}.{}.{}", self.category, self.division, self.code)
    }

    /// Six-digit full code
    pub fn full_code(&self) -> String {
        format!("{}{}{}", self.category, self.division, self.code)
    }
}

/// Any node of the taxonomy, as returned by code lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaxonomyNode<'a> {
    Category(&'a Category),
    Division(&'a Division),
    Section(&'a Section),
}

impl<'a> TaxonomyNode<'a> {
    pub fn description(&self) -> &'a str {
        match self {
            TaxonomyNode::Category(c) => &c.description,
            TaxonomyNode::Division(d) => &d.description,
            TaxonomyNode::Section(s) => &s.description,
        }
    }

    /// Inclusion notes and cross-references; categories carry none
    pub fn guidelines(&self) -> &'a [String] {
        match self {
            TaxonomyNode::Category(_) => &[],
            TaxonomyNode::Division(d) => &d.guidelines,
            TaxonomyNode::Section(s) => &s.guidelines,
        }
    }

    pub fn excludes(&self) -> &'a [String] {
        match self {
            TaxonomyNode::Category(_) => &[],
            TaxonomyNode::Division(d) => &d.excludes,
            TaxonomyNode::Section(s) => &s.excludes,
        }
    }

    /// Dotted address of the node (`CC`, `CC.DD` or `CC.DD.SS`)
    pub fn label(&self) -> String {
        match self {
            TaxonomyNode::Category(c) => c.code.clone(),
            TaxonomyNode::Division(d) => d.label(),
            TaxonomyNode::Section(s) => s.label(),
        }
    }
}
