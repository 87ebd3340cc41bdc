//! Program record data model.

use serde::{Deserialize, Serialize};

/// Catalog spelling of the "no restriction" sentinel.
pub const ANY_SENTINEL: &str = "ALL";

/// A targeting restriction on one eligibility axis (region or category).
///
/// Serialized as a bare string: `"ALL"` means [`Restriction::Any`], anything
/// else is an exact, case-sensitive requirement. `"ANY"` is accepted on input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Restriction {
    Any,
    Only(String),
}

impl Restriction {
    /// Whether `value` satisfies this restriction.
    pub fn admits(&self, value: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Only(required) => required == value,
        }
    }

    pub fn is_any(&self) -> bool {
        matches!(self, Self::Any)
    }
}

impl From<String> for Restriction {
    fn from(s: String) -> Self {
        if s == ANY_SENTINEL || s == "ANY" {
            Self::Any
        } else {
            Self::Only(s)
        }
    }
}

impl From<Restriction> for String {
    fn from(r: Restriction) -> Self {
        match r {
            Restriction::Any => ANY_SENTINEL.to_string(),
            Restriction::Only(s) => s,
        }
    }
}

impl std::fmt::Display for Restriction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Any => write!(f, "{ANY_SENTINEL}"),
            Self::Only(s) => write!(f, "{s}"),
        }
    }
}

/// One benefit scheme: its eligibility rule plus descriptive metadata.
///
/// Field names follow the catalog JSON format (`state`, `income_max`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramRecord {
    pub id: String,
    pub name: String,
    #[serde(rename = "state")]
    pub target_region: Restriction,
    #[serde(rename = "category")]
    pub target_category: Restriction,
    #[serde(rename = "income_max")]
    pub income_ceiling: u64,
    pub age_min: u32,
    pub age_max: u32,
    pub benefits: String,
    #[serde(rename = "documents")]
    pub required_documents: Vec<String>,
    #[serde(rename = "apply_link")]
    pub apply_url: String,
}
