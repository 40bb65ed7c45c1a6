//! Design code formatting
//!
//! Every level of the taxonomy is addressed by a two-digit component. Full
//! codes are the concatenation `CCDDSS`; explanations shown to people use the
//! dotted form `CC.DD.SS`.

use std::fmt;
use thiserror::Error;

/// Taxonomy level of a code component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodeLevel {
    Category,
    Division,
    Section,
}

impl fmt::Display for CodeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodeLevel::Category => write!(f, "category"),
            CodeLevel::Division => write!(f, "division"),
            CodeLevel::Section => write!(f, "section"),
        }
    }
}

/// A code component or full code failed the fixed-width digit check
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodeFormatError {
    #[error("Missing {level} code component")]
    Missing { level: CodeLevel },

    #[error("Invalid {level} code component '{value}': expected one or two digits")]
    Invalid { level: CodeLevel, value: String },

    #[error("Invalid full design code '{0}': expected CCDDSS or CC.DD.SS")]
    InvalidFull(String),
}

/// Normalize one component to exactly two digits.
///
/// `"7"` becomes `"07"`. Empty input, non-digits, and anything longer than
/// two digits are rejected rather than truncated.
pub fn normalize_part(value: &str, level: CodeLevel) -> Result<String, CodeFormatError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CodeFormatError::Missing { level });
    }
    if trimmed.len() > 2 || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CodeFormatError::Invalid {
            level,
            value: trimmed.to_string(),
        });
    }
    Ok(format!("{:0>2}", trimmed))
}

/// Join category, division and section into a six-digit full code.
///
/// ```
/// use design_code_chat::taxonomy::finalize_full_code;
///
/// assert_eq!(finalize_full_code("7", "1", "3").unwrap(), "070103");
/// assert!(finalize_full_code("", "1", "3").is_err());
/// ```
pub fn finalize_full_code(
    category: &str,
    division: &str,
    section: &str,
) -> Result<String, CodeFormatError> {
    let category = normalize_part(category, CodeLevel::Category)?;
    let division = normalize_part(division, CodeLevel::Division)?;
    let section = normalize_part(section, CodeLevel::Section)?;
    Ok(format!("{}{}{}", category, division, section))
}

/// Parse a full code written as `CCDDSS` or `CC.DD.SS` into its six-digit form
pub fn parse_full_code(code: &str) -> Result<String, CodeFormatError> {
    let trimmed = code.trim();
    let parts: Vec<&str> = if trimmed.contains('.') {
        trimmed.split('.').collect()
    } else if trimmed.len() == 6 && trimmed.is_ascii() {
        vec![&trimmed[0..2], &trimmed[2..4], &trimmed[4..6]]
    } else {
        return Err(CodeFormatError::InvalidFull(trimmed.to_string()));
    };

    match parts.as_slice() {
        [c, d, s] if c.len() == 2 && d.len() == 2 && s.len() == 2 => {
            finalize_full_code(c, d, s).map_err(|_| CodeFormatError::InvalidFull(trimmed.to_string()))
        }
        _ => Err(CodeFormatError::InvalidFull(trimmed.to_string())),
    }
}

/// Render a six-digit full code as `CC.DD.SS`; other input is returned as-is
pub fn dotted(code: &str) -> String {
    if code.len() == 6 && code.bytes().all(|b| b.is_ascii_digit()) {
        format!("{}.{}.{}", &code[0..2], &code[2..4], &code[4..6])
    } else {
        code.to_string()
    }
}

/// Render a division pair as `CC.DD`
pub fn division_label(category: &str, division: &str) -> String {
    format!("{}.{}", category, division)
}
