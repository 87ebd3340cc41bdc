//! Eligibility matcher: pure function from (profile, catalog) to matches.
//!
//! Each record is checked on four axes in a fixed order: age, income,
//! category, region. The first failing axis decides the [`Ineligibility`];
//! records passing all four carry a reason built from the satisfied facts.

use serde::Serialize;

use crate::catalog::{ProgramRecord, Restriction};
use crate::profile::CompleteProfile;

/// Separator between the facts of a reason string.
const REASON_SEPARATOR: &str = " • ";

/// A program the profile qualifies for, with the reason why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EligibilityMatch {
    pub program: ProgramRecord,
    pub reason: String,
}

/// The first criterion a profile failed for a given record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ineligibility {
    Age { min: u32, max: u32 },
    Income { ceiling: u64 },
    Category { required: String },
    Region { required: String },
}

impl std::fmt::Display for Ineligibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Age { min, max } => write!(f, "Age must be between {min}-{max}"),
            Self::Income { ceiling } => {
                write!(f, "Income must not exceed ₹{}", group_thousands(*ceiling))
            }
            Self::Category { required } => {
                write!(f, "This scheme is for {required} category only")
            }
            Self::Region { required } => write!(f, "This scheme is only for {required}"),
        }
    }
}

/// Check one record. Returns the satisfied facts, or the first failing axis.
pub fn check(profile: &CompleteProfile, record: &ProgramRecord) -> Result<Vec<String>, Ineligibility> {
    let mut facts = Vec::with_capacity(4);

    if profile.age < record.age_min || profile.age > record.age_max {
        return Err(Ineligibility::Age {
            min: record.age_min,
            max: record.age_max,
        });
    }
    facts.push(format!(
        "Age {} is within {}-{} range",
        profile.age, record.age_min, record.age_max
    ));

    if profile.income > record.income_ceiling {
        return Err(Ineligibility::Income {
            ceiling: record.income_ceiling,
        });
    }
    facts.push(format!(
        "Income ₹{} is within the ₹{} limit",
        group_thousands(profile.income),
        group_thousands(record.income_ceiling)
    ));

    if !record.target_category.admits(&profile.category) {
        return Err(Ineligibility::Category {
            required: record.target_category.to_string(),
        });
    }
    if let Restriction::Only(category) = &record.target_category {
        facts.push(format!("{category} category matches"));
    }

    if !record.target_region.admits(&profile.region) {
        return Err(Ineligibility::Region {
            required: record.target_region.to_string(),
        });
    }
    if let Restriction::Only(region) = &record.target_region {
        facts.push(format!("{region} state matches"));
    }

    Ok(facts)
}

/// All records the profile is eligible for, in catalog order.
pub fn match_programs(profile: &CompleteProfile, catalog: &[ProgramRecord]) -> Vec<EligibilityMatch> {
    catalog
        .iter()
        .filter_map(|record| {
            check(profile, record).ok().map(|facts| EligibilityMatch {
                program: record.clone(),
                reason: facts.join(REASON_SEPARATOR),
            })
        })
        .collect()
}

/// Format an integer with comma thousands separators (`250000` → `250,000`).
pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogProvider, StaticCatalog};

    fn record(id: &str, age: (u32, u32), ceiling: u64, category: &str, region: &str) -> ProgramRecord {
        ProgramRecord {
            id: id.to_string(),
            name: format!("Program {id}"),
            target_region: Restriction::from(region.to_string()),
            target_category: Restriction::from(category.to_string()),
            income_ceiling: ceiling,
            age_min: age.0,
            age_max: age.1,
            benefits: "Benefits".to_string(),
            required_documents: vec!["Aadhaar Card".to_string()],
            apply_url: "https://example.gov.in".to_string(),
        }
    }

    fn profile(age: u32, income: u64, region: &str, category: &str) -> CompleteProfile {
        CompleteProfile {
            age,
            income,
            region: region.to_string(),
            category: category.to_string(),
        }
    }

    #[test]
    fn age_boundaries_inclusive() {
        let r = record("a", (17, 25), 100, "ALL", "ALL");
        assert!(check(&profile(17, 0, "Goa", "General"), &r).is_ok());
        assert!(check(&profile(25, 0, "Goa", "General"), &r).is_ok());
        assert_eq!(
            check(&profile(16, 0, "Goa", "General"), &r),
            Err(Ineligibility::Age { min: 17, max: 25 })
        );
        assert_eq!(
            check(&profile(26, 0, "Goa", "General"), &r),
            Err(Ineligibility::Age { min: 17, max: 25 })
        );
    }

    #[test]
    fn income_ceiling_inclusive_and_no_floor() {
        let r = record("a", (1, 99), 250_000, "ALL", "ALL");
        assert!(check(&profile(20, 250_000, "Goa", "SC"), &r).is_ok());
        assert!(check(&profile(20, 0, "Goa", "SC"), &r).is_ok());
        assert_eq!(
            check(&profile(20, 250_001, "Goa", "SC"), &r),
            Err(Ineligibility::Income { ceiling: 250_000 })
        );
    }

    #[test]
    fn any_sentinel_matches_every_value() {
        let r = record("a", (1, 99), 1_000_000, "ALL", "ALL");
        for (region, category) in [("Goa", "SC"), ("Kerala", "Minority"), ("x", "y")] {
            assert!(check(&profile(30, 10, region, category), &r).is_ok());
        }
    }

    #[test]
    fn category_and_region_are_exact_case_sensitive() {
        let r = record("a", (1, 99), 1_000_000, "OBC", "Karnataka");
        assert!(check(&profile(20, 0, "Karnataka", "OBC"), &r).is_ok());
        assert_eq!(
            check(&profile(20, 0, "Karnataka", "obc"), &r),
            Err(Ineligibility::Category { required: "OBC".into() })
        );
        assert_eq!(
            check(&profile(20, 0, "karnataka", "OBC"), &r),
            Err(Ineligibility::Region { required: "Karnataka".into() })
        );
    }

    #[test]
    fn obc_maharashtra_scenario() {
        let r = record("yasasvi", (15, 25), 250_000, "OBC", "ALL");
        let p = profile(20, 200_000, "Maharashtra", "OBC");
        let matches = match_programs(&p, std::slice::from_ref(&r));
        assert_eq!(matches.len(), 1);
        let reason = &matches[0].reason;
        assert!(reason.contains("Age 20"), "{reason}");
        assert!(reason.contains("Income"), "{reason}");
        assert!(reason.contains("OBC category"), "{reason}");
        // ANY-matched region is not claimed as a match.
        assert!(!reason.contains("state matches"), "{reason}");
    }

    #[test]
    fn st_scheme_fails_on_category_after_age_and_income() {
        let r = record("st", (15, 25), 250_000, "ST", "ALL");
        let p = profile(20, 200_000, "Maharashtra", "OBC");
        assert!(match_programs(&p, std::slice::from_ref(&r)).is_empty());
        assert_eq!(
            check(&p, &r),
            Err(Ineligibility::Category { required: "ST".into() })
        );
    }

    #[test]
    fn first_failing_axis_wins() {
        // Fails age, income and category; age is reported.
        let r = record("x", (30, 40), 10, "ST", "Goa");
        let p = profile(20, 200_000, "Kerala", "OBC");
        assert!(matches!(check(&p, &r), Err(Ineligibility::Age { .. })));
    }

    #[test]
    fn empty_catalog_yields_empty_result() {
        assert!(match_programs(&profile(20, 0, "Goa", "SC"), &[]).is_empty());
    }

    #[test]
    fn results_keep_catalog_order_and_are_idempotent() {
        let catalog = vec![
            record("c", (1, 99), 1_000_000, "ALL", "ALL"),
            record("a", (1, 99), 1_000_000, "ALL", "ALL"),
            record("skip", (50, 99), 1_000_000, "ALL", "ALL"),
            record("b", (1, 99), 1_000_000, "ALL", "ALL"),
        ];
        let p = profile(20, 0, "Goa", "SC");
        let first = match_programs(&p, &catalog);
        let ids: Vec<_> = first.iter().map(|m| m.program.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
        assert_eq!(first, match_programs(&p, &catalog));
    }

    #[tokio::test]
    async fn matches_are_independently_verified_against_builtin_catalog() {
        let catalog = StaticCatalog::builtin()
            .unwrap()
            .list_active_programs()
            .await
            .unwrap();

        let regions = ["Maharashtra", "Karnataka", "Tamil Nadu", "Uttar Pradesh", "Goa"];
        let categories = ["General", "SC", "ST", "OBC", "EWS", "Minority"];
        for age in [5, 10, 14, 15, 17, 18, 25, 26, 30, 35, 60] {
            for income in [0, 150_000, 200_000, 250_000, 250_001, 450_000, 800_000, 900_000] {
                for region in regions {
                    for category in categories {
                        let p = profile(age, income, region, category);
                        let matches = match_programs(&p, &catalog);
                        for m in &matches {
                            let r = &m.program;
                            assert!(r.age_min <= age && age <= r.age_max);
                            assert!(income <= r.income_ceiling);
                            assert!(r.target_category.is_any()
                                || r.target_category == Restriction::Only(category.into()));
                            assert!(r.target_region.is_any()
                                || r.target_region == Restriction::Only(region.into()));
                            assert!(!m.reason.is_empty());
                        }
                        // Nothing eligible was dropped either.
                        let expected = catalog.iter().filter(|r| check(&p, r).is_ok()).count();
                        assert_eq!(matches.len(), expected);
                    }
                }
            }
        }
    }

    #[test]
    fn ineligibility_messages() {
        assert_eq!(
            Ineligibility::Income { ceiling: 250_000 }.to_string(),
            "Income must not exceed ₹250,000"
        );
        assert_eq!(
            Ineligibility::Region { required: "Goa".into() }.to_string(),
            "This scheme is only for Goa"
        );
    }

    #[test]
    fn thousands_grouping() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(250_000), "250,000");
        assert_eq!(group_thousands(12_345_678), "12,345,678");
    }
}
