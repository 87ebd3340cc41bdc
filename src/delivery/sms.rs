//! SMS text for one program.

use crate::catalog::ProgramRecord;

const BENEFITS_PREVIEW_CHARS: usize = 150;
const LISTED_DOCUMENTS: usize = 3;

/// Plain-text SMS body: header, program name, a benefits preview, the apply
/// link and the first few required documents.
pub fn compose_sms(program: &ProgramRecord) -> String {
    let mut benefits: String = program.benefits.chars().take(BENEFITS_PREVIEW_CHARS).collect();
    if program.benefits.chars().count() > BENEFITS_PREVIEW_CHARS {
        benefits.push_str("...");
    }

    let mut message = format!(
        "BharatConnect AI\n\n{}\n\nBenefits: {benefits}\n\nApply: {}\n\nDocuments needed:\n",
        program.name, program.apply_url
    );
    for doc in program.required_documents.iter().take(LISTED_DOCUMENTS) {
        message.push_str(&format!("- {doc}\n"));
    }
    if program.required_documents.len() > LISTED_DOCUMENTS {
        message.push_str(&format!(
            "+ {} more\n",
            program.required_documents.len() - LISTED_DOCUMENTS
        ));
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Restriction;

    fn program(benefits: &str, docs: &[&str]) -> ProgramRecord {
        ProgramRecord {
            id: "scheme_x".into(),
            name: "Test Scholarship".into(),
            target_region: Restriction::Any,
            target_category: Restriction::Any,
            income_ceiling: 100_000,
            age_min: 10,
            age_max: 20,
            benefits: benefits.into(),
            required_documents: docs.iter().map(|d| d.to_string()).collect(),
            apply_url: "https://scholarships.gov.in".into(),
        }
    }

    #[test]
    fn short_program_listed_in_full() {
        let sms = compose_sms(&program("₹10,000 per year", &["Aadhaar Card", "Bank Passbook"]));
        assert_eq!(
            sms,
            "BharatConnect AI\n\nTest Scholarship\n\nBenefits: ₹10,000 per year\n\n\
Apply: https://scholarships.gov.in\n\nDocuments needed:\n- Aadhaar Card\n- Bank Passbook\n"
        );
    }

    #[test]
    fn long_benefits_truncated_by_characters() {
        let benefits = "₹".repeat(200);
        let sms = compose_sms(&program(&benefits, &[]));
        let expected = format!("Benefits: {}...", "₹".repeat(150));
        assert!(sms.contains(&expected));
    }

    #[test]
    fn only_three_documents_listed() {
        let sms = compose_sms(&program("x", &["A", "B", "C", "D", "E"]));
        assert!(sms.contains("- C\n"));
        assert!(!sms.contains("- D"));
        assert!(sms.ends_with("+ 2 more\n"));
    }
}
