//! Engine configuration
//!
//! Read from environment variables, with defaults suitable for local use:
//!
//! | Variable | Default |
//! |---|---|
//! | `DESIGN_CODE_LLM_TIMEOUT_SECS` | `60` |
//! | `DESIGN_CODE_MAX_CODES` | `7` |
//! | `DESIGN_CODE_LIMIT_POLICY` | `flag` (`truncate`, `reject`) |
//! | `DESIGN_CODE_CATALOG` | embedded catalog |

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_MAX_CODES: usize = 7;

/// What to do when a finalized classification names too many codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CodeLimitPolicy {
    /// Keep every code, mark the result and log a warning
    #[default]
    Flag,
    /// Keep the first `max_codes` codes
    Truncate,
    /// Fail the turn with `CodeLimitExceeded`
    Reject,
}

impl FromStr for CodeLimitPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "flag" | "warn" => Ok(CodeLimitPolicy::Flag),
            "truncate" => Ok(CodeLimitPolicy::Truncate),
            "reject" => Ok(CodeLimitPolicy::Reject),
            other => Err(format!(
                "Unknown code limit policy '{}'. Use 'flag', 'truncate' or 'reject'",
                other
            )),
        }
    }
}

impl fmt::Display for CodeLimitPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodeLimitPolicy::Flag => write!(f, "flag"),
            CodeLimitPolicy::Truncate => write!(f, "truncate"),
            CodeLimitPolicy::Reject => write!(f, "reject"),
        }
    }
}

/// Settings for the dialogue engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Deadline for one generative call
    pub llm_timeout: Duration,
    /// Ceiling on full codes per element
    pub max_codes: usize,
    pub limit_policy: CodeLimitPolicy,
    /// Catalog file replacing the embedded one
    pub catalog_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            llm_timeout: Duration::from_secs(DEFAULT_LLM_TIMEOUT_SECS),
            max_codes: DEFAULT_MAX_CODES,
            limit_policy: CodeLimitPolicy::default(),
            catalog_path: None,
        }
    }
}

impl EngineConfig {
    /// Read settings from the environment. Unparseable values fall back to
    /// the default with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through an arbitrary lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let llm_timeout = parse_or("DESIGN_CODE_LLM_TIMEOUT_SECS", &lookup, DEFAULT_LLM_TIMEOUT_SECS)
            .max(1);
        let max_codes = parse_or("DESIGN_CODE_MAX_CODES", &lookup, DEFAULT_MAX_CODES).max(1);
        let limit_policy = parse_or("DESIGN_CODE_LIMIT_POLICY", &lookup, defaults.limit_policy);
        let catalog_path = lookup("DESIGN_CODE_CATALOG")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        Self {
            llm_timeout: Duration::from_secs(llm_timeout),
            max_codes,
            limit_policy,
            catalog_path,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.llm_timeout = timeout;
        self
    }

    pub fn with_max_codes(mut self, max_codes: usize) -> Self {
        self.max_codes = max_codes;
        self
    }

    pub fn with_limit_policy(mut self, policy: CodeLimitPolicy) -> Self {
        self.limit_policy = policy;
        self
    }
}

fn parse_or<T>(key: &str, lookup: &impl Fn(&str) -> Option<String>, default: T) -> T
where
    T: FromStr + fmt::Display,
    T::Err: fmt::Display,
{
    match lookup(key) {
        Some(raw) => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(e) => {
                warn!(key, value = %raw, error = %e, default = %default, "Ignoring invalid setting");
                default
            }
        },
        None => default,
    }
}
