//! Answer validators: one per profile question.
//!
//! Each validator turns free text into a canonical value or a [`Rejection`].
//! Region and category validators only ever return an entry of their closed
//! list, never the raw user text.

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::session::{Answer, PendingQuestion};

/// States and union territories accepted as a region answer.
pub const REGIONS: &[&str] = &[
    "Andhra Pradesh",
    "Arunachal Pradesh",
    "Assam",
    "Bihar",
    "Chhattisgarh",
    "Goa",
    "Gujarat",
    "Haryana",
    "Himachal Pradesh",
    "Jharkhand",
    "Karnataka",
    "Kerala",
    "Madhya Pradesh",
    "Maharashtra",
    "Manipur",
    "Meghalaya",
    "Mizoram",
    "Nagaland",
    "Odisha",
    "Punjab",
    "Rajasthan",
    "Sikkim",
    "Tamil Nadu",
    "Telangana",
    "Tripura",
    "Uttar Pradesh",
    "Uttarakhand",
    "West Bengal",
    "Delhi",
    "Jammu and Kashmir",
    "Ladakh",
];

/// Social categories accepted as a category answer.
pub const CATEGORIES: &[&str] = &["General", "SC", "ST", "OBC", "EWS", "Minority"];

pub const DEFAULT_AGE_MIN: u32 = 1;
pub const DEFAULT_AGE_MAX: u32 = 120;

/// Whole-word integers. "1st" and "12th" are not numbers here.
static INTEGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-?\b\d+\b").expect("integer pattern"));

/// A number tied to an age cue: "age 17", "aged 17", "17 years", "17 yrs old".
static AGE_CUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\bage[ds]?\b(?:\s+is)?\s*[:=]?\s*(?P<after>-?\b\d+)\b|(?P<before>-?\b\d+)\s*(?:years?|yrs?|y/?o)\b",
    )
    .expect("age cue pattern")
});

static AMOUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?P<neg>-|\bminus\s*)?(?:₹|\brs\.?|\binr)?\s*(?P<num>\d[\d,]*(?:\.\d+)?)\s*(?P<unit>lpa|thousand|lakhs|lakh|lacs|lac|crores|crore|cr|k|l)?\b",
    )
    .expect("amount pattern")
});

static ZERO_INCOME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(no income|zero|nil|none|unemployed|nothing)\b").expect("zero income pattern")
});

/// How free text is matched against a closed list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPolicy {
    /// The whole message must equal an entry, ignoring case and punctuation.
    Exact,
    /// An entry must appear in the message as a whole-word phrase.
    #[default]
    Contains,
}

impl FromStr for MatchPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exact" => Ok(Self::Exact),
            "contains" => Ok(Self::Contains),
            other => Err(format!("unknown match policy '{other}' (expected exact or contains)")),
        }
    }
}

/// Why an answer was not accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// No number where one was required.
    MissingNumber,
    /// Several numbers could be the age and nothing marks which one.
    SeveralNumbers,
    AgeOutOfRange { min: u32, max: u32 },
    /// A fractional amount with no unit, such as "3.5".
    MissingUnit,
    NegativeIncome,
    IncomeTooLarge,
    UnknownRegion,
    UnknownCategory,
    /// More than one list entry matched.
    Ambiguous { candidates: Vec<&'static str> },
    /// Profile collection is already complete.
    NothingPending,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingNumber => write!(f, "no number found"),
            Self::SeveralNumbers => write!(f, "several candidate numbers"),
            Self::MissingUnit => write!(f, "fractional amount without a unit"),
            Self::AgeOutOfRange { min, max } => write!(f, "age outside {min}-{max}"),
            Self::NegativeIncome => write!(f, "negative income"),
            Self::IncomeTooLarge => write!(f, "income too large"),
            Self::UnknownRegion => write!(f, "unknown region"),
            Self::UnknownCategory => write!(f, "unknown category"),
            Self::Ambiguous { candidates } => write!(f, "ambiguous: {}", candidates.join(", ")),
            Self::NothingPending => write!(f, "nothing pending"),
        }
    }
}

/// Validators configured for one deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerValidator {
    pub age_min: u32,
    pub age_max: u32,
    pub policy: MatchPolicy,
}

impl Default for AnswerValidator {
    fn default() -> Self {
        Self {
            age_min: DEFAULT_AGE_MIN,
            age_max: DEFAULT_AGE_MAX,
            policy: MatchPolicy::default(),
        }
    }
}

impl AnswerValidator {
    /// Validate `message` as the answer to `question`.
    pub fn validate(&self, question: PendingQuestion, message: &str) -> Result<Answer, Rejection> {
        match question {
            PendingQuestion::Age => self.age(message).map(Answer::Age),
            PendingQuestion::Income => income(message).map(Answer::Income),
            PendingQuestion::Region => self.region(message).map(|r| Answer::Region(r.to_string())),
            PendingQuestion::Category => {
                self.category(message).map(|c| Answer::Category(c.to_string()))
            }
            PendingQuestion::Complete => Err(Rejection::NothingPending),
        }
    }

    /// The age in the message, within the configured bounds.
    ///
    /// A number marked as an age ("age 17", "17 years") wins. Otherwise the
    /// message must hold exactly one whole-word number within the bounds.
    pub fn age(&self, message: &str) -> Result<u32, Rejection> {
        let out_of_range = Rejection::AgeOutOfRange {
            min: self.age_min,
            max: self.age_max,
        };
        // Overflow and negatives are both out of range.
        let parse = |raw: &str| -> Option<u32> {
            raw.parse::<u32>()
                .ok()
                .filter(|age| (self.age_min..=self.age_max).contains(age))
        };

        if let Some(caps) = AGE_CUE.captures(message) {
            let raw = caps
                .name("after")
                .or_else(|| caps.name("before"))
                .map_or("", |m| m.as_str());
            return parse(raw).ok_or(out_of_range);
        }

        let numbers: Vec<&str> = INTEGER.find_iter(message).map(|m| m.as_str()).collect();
        if numbers.is_empty() {
            return Err(Rejection::MissingNumber);
        }
        let in_range: Vec<u32> = numbers.iter().filter_map(|raw| parse(raw)).collect();
        match in_range.as_slice() {
            [age] => Ok(*age),
            [] => Err(out_of_range),
            _ => Err(Rejection::SeveralNumbers),
        }
    }

    pub fn region(&self, message: &str) -> Result<&'static str, Rejection> {
        pick(REGIONS, message, self.policy).map_err(|candidates| {
            if candidates.is_empty() {
                Rejection::UnknownRegion
            } else {
                Rejection::Ambiguous { candidates }
            }
        })
    }

    pub fn category(&self, message: &str) -> Result<&'static str, Rejection> {
        pick(CATEGORIES, message, self.policy).map_err(|candidates| {
            if candidates.is_empty() {
                Rejection::UnknownCategory
            } else {
                Rejection::Ambiguous { candidates }
            }
        })
    }
}

/// Annual income in rupees.
///
/// Understands thousands separators, decimals, and the units k/thousand,
/// lakh/lac/l/LPA and crore/cr when written right after the number. A
/// fractional amount needs a unit. Phrases meaning "no income" map to zero.
pub fn income(message: &str) -> Result<u64, Rejection> {
    let Some(caps) = AMOUNT.captures(message) else {
        return if ZERO_INCOME.is_match(message) {
            Ok(0)
        } else {
            Err(Rejection::MissingNumber)
        };
    };

    if caps.name("neg").is_some() {
        return Err(Rejection::NegativeIncome);
    }

    let digits = caps["num"].replace(',', "");
    let amount: f64 = digits.parse().map_err(|_| Rejection::MissingNumber)?;
    let multiplier = match caps
        .name("unit")
        .map(|u| u.as_str().to_ascii_lowercase())
        .as_deref()
    {
        Some("k" | "thousand") => 1_000.0,
        Some("lakh" | "lakhs" | "lac" | "lacs" | "l" | "lpa") => 100_000.0,
        Some("crore" | "crores" | "cr") => 10_000_000.0,
        _ => {
            if amount.fract() != 0.0 {
                return Err(Rejection::MissingUnit);
            }
            1.0
        }
    };

    let rupees = (amount * multiplier).round();
    if !rupees.is_finite() || rupees >= u64::MAX as f64 {
        return Err(Rejection::IncomeTooLarge);
    }
    Ok(rupees as u64)
}

/// Lowercase, with every run of non-alphanumerics collapsed to one space and
/// a space on each side, so phrase search respects word boundaries.
fn normalize(text: &str) -> String {
    let mut out = String::from(" ");
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        out.push_str(&word.to_lowercase());
        out.push(' ');
    }
    out
}

/// Select one entry of `list` for `message`. On failure returns the
/// conflicting candidates, empty when nothing matched.
fn pick(
    list: &[&'static str],
    message: &str,
    policy: MatchPolicy,
) -> Result<&'static str, Vec<&'static str>> {
    let haystack = normalize(message);
    let candidates: Vec<(&'static str, String)> = list
        .iter()
        .map(|entry| (*entry, normalize(entry)))
        .filter(|(_, needle)| match policy {
            MatchPolicy::Exact => haystack == *needle,
            MatchPolicy::Contains => haystack.contains(needle.as_str()),
        })
        .collect();

    let Some((longest, longest_norm)) = candidates.iter().max_by_key(|(_, n)| n.len()) else {
        return Err(Vec::new());
    };
    if candidates
        .iter()
        .all(|(_, n)| longest_norm.contains(n.as_str()))
    {
        Ok(*longest)
    } else {
        Err(candidates.iter().map(|(e, _)| *e).collect())
    }
}
