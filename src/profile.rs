//! User profile: the four answers that drive eligibility.

use serde::{Deserialize, Serialize};

use crate::error::EligibilityError;

/// Partially collected profile.
///
/// A field is only ever set to a value that passed its validator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub income: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "state")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl UserProfile {
    pub fn is_complete(&self) -> bool {
        self.age.is_some()
            && self.income.is_some()
            && self.region.is_some()
            && self.category.is_some()
    }

    /// Names of the fields still unset, in question order.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.age.is_none() {
            missing.push("age");
        }
        if self.income.is_none() {
            missing.push("income");
        }
        if self.region.is_none() {
            missing.push("region");
        }
        if self.category.is_none() {
            missing.push("category");
        }
        missing
    }

    /// Convert to a [`CompleteProfile`], failing if any field is unset.
    pub fn try_complete(&self) -> Result<CompleteProfile, EligibilityError> {
        match (&self.age, &self.income, &self.region, &self.category) {
            (Some(age), Some(income), Some(region), Some(category)) => Ok(CompleteProfile {
                age: *age,
                income: *income,
                region: region.clone(),
                category: category.clone(),
            }),
            _ => Err(EligibilityError::IncompleteProfile {
                missing: self.missing_fields(),
            }),
        }
    }
}

/// A profile with every field set. The only input the matcher accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteProfile {
    pub age: u32,
    pub income: u64,
    #[serde(alias = "state")]
    pub region: String,
    pub category: String,
}

impl From<CompleteProfile> for UserProfile {
    fn from(p: CompleteProfile) -> Self {
        Self {
            age: Some(p.age),
            income: Some(p.income),
            region: Some(p.region),
            category: Some(p.category),
        }
    }
}
