//! Design Code Taxonomy
//!
//! Static three-level catalog (category → division → section) with code
//! formatting and the text rendering used when slices are shown to the model.

mod codes;
mod format;
mod node;
mod store;

pub use codes::{
    division_label, dotted, finalize_full_code, normalize_part, parse_full_code, CodeFormatError,
    CodeLevel,
};
pub use format::{
    format_categories, format_divisions, format_sections, CATEGORIES_HEADER, DIVISIONS_MARKER,
    SECTIONS_MARKER,
};
pub use node::{Category, Division, Section, TaxonomyNode};
pub use store::{TaxonomyLoadError, TaxonomyStore};
