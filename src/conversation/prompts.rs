//! User-facing text: question prompts, re-prompt preambles and the
//! deterministic explanation fallback.

use crate::eligibility::EligibilityMatch;
use crate::session::PendingQuestion;

use super::validate::Rejection;

pub const WELCOME: &str =
    "Namaste! I'm BharatConnect AI. I'll help you discover government schemes you may be eligible for.";

/// Prompt for the pending question. `None` once collection is complete.
pub fn question_prompt(question: PendingQuestion) -> Option<&'static str> {
    match question {
        PendingQuestion::Age => Some(
            "To help you find the right schemes, I need a few details. Let's start with your age. How old are you?",
        ),
        PendingQuestion::Income => {
            Some("Great! Now, what is your family's annual income in rupees?")
        }
        PendingQuestion::Region => Some(
            "Thank you! Which state are you from? (e.g., Maharashtra, Karnataka, Tamil Nadu, etc.)",
        ),
        PendingQuestion::Category => {
            Some("Almost done! What is your category? (General, SC, ST, OBC, EWS, or Minority)")
        }
        PendingQuestion::Complete => None,
    }
}

/// Short explanation of why an answer was not accepted.
pub fn failure_preamble(rejection: &Rejection) -> String {
    match rejection {
        Rejection::MissingNumber => "Sorry, I couldn't find a number in that.".to_string(),
        Rejection::SeveralNumbers => {
            "I see more than one number there. Please send just your age.".to_string()
        }
        Rejection::MissingUnit => {
            "Was that in lakh? Please write it like 350000 or 3.5 lakh.".to_string()
        }
        Rejection::AgeOutOfRange { min, max } => {
            format!("Please enter an age between {min} and {max}.")
        }
        Rejection::NegativeIncome => "Income can't be negative.".to_string(),
        Rejection::IncomeTooLarge => "That amount looks too large to be an annual income.".to_string(),
        Rejection::UnknownRegion => "Sorry, I didn't recognise that state.".to_string(),
        Rejection::UnknownCategory => "Sorry, I didn't recognise that category.".to_string(),
        Rejection::Ambiguous { candidates } => {
            format!("Did you mean {}? Please name just one.", join_or(candidates))
        }
        Rejection::NothingPending => String::new(),
    }
}

/// Reply for turns after the profile is complete.
pub fn completed_notice(allow_restart: bool) -> &'static str {
    if allow_restart {
        "Your profile is complete and your matching schemes have been shown. Say \"restart\" to check again with different details."
    } else {
        "Your profile is complete and your matching schemes have been shown."
    }
}

/// Messages that restart a completed conversation.
pub fn is_restart_command(message: &str) -> bool {
    let normalized = message
        .trim()
        .trim_end_matches(['.', '!'])
        .to_lowercase();
    matches!(normalized.as_str(), "restart" | "start over" | "reset")
}

/// Deterministic explanation used when the generator is absent or fails.
///
/// Never empty, and only ever names programs from `matches`.
pub fn fallback_reply(matches: &[EligibilityMatch]) -> String {
    match matches {
        [] => "Based on your profile, I couldn't find any schemes you're currently eligible for. \
However, eligibility criteria can change, so I recommend checking back periodically or exploring \
options to meet the requirements for specific schemes."
            .to_string(),
        [only] => format!(
            "Great news! You're eligible for **{}**. This scheme offers: {}",
            only.program.name, only.program.benefits
        ),
        few if few.len() <= 3 => {
            let names = few
                .iter()
                .map(|m| format!("**{}**", m.program.name))
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                "Excellent! You're eligible for {} schemes: {names}. Each scheme has unique benefits \
tailored to your needs. Check out the details below!",
                few.len()
            )
        }
        many => format!(
            "Wonderful! You're eligible for **{} government schemes**! This gives you multiple options \
to choose from based on your specific educational goals. Review the schemes below to see which ones \
align best with your needs.",
            many.len()
        ),
    }
}

fn join_or(items: &[&str]) -> String {
    match items {
        [] => String::new(),
        [one] => one.to_string(),
        [init @ .., last] => format!("{} or {last}", init.join(", ")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ProgramRecord, Restriction};

    fn program(id: &str, name: &str) -> EligibilityMatch {
        EligibilityMatch {
            program: ProgramRecord {
                id: id.into(),
                name: name.into(),
                target_region: Restriction::Any,
                target_category: Restriction::Any,
                income_ceiling: 1,
                age_min: 1,
                age_max: 2,
                benefits: format!("{name} benefits"),
                required_documents: vec![],
                apply_url: "https://example.gov.in".into(),
            },
            reason: String::new(),
        }
    }

    #[test]
    fn every_open_question_has_a_prompt() {
        use PendingQuestion::*;
        for q in [Age, Income, Region, Category] {
            assert!(!question_prompt(q).unwrap().is_empty());
        }
        assert!(question_prompt(Complete).is_none());
        assert!(question_prompt(Age).unwrap().contains("How old are you?"));
    }

    #[test]
    fn number_rejections_explain_what_to_send() {
        assert!(failure_preamble(&Rejection::SeveralNumbers).contains("just your age"));
        assert!(failure_preamble(&Rejection::MissingUnit).contains("3.5 lakh"));
    }

    #[test]
    fn fallback_is_never_empty_and_names_only_matches() {
        let all: Vec<_> = (0..6)
            .map(|i| program(&format!("p{i}"), &format!("Scheme {i}")))
            .collect();
        for n in 0..=all.len() {
            let text = fallback_reply(&all[..n]);
            assert!(!text.is_empty());
            for unmatched in &all[n..] {
                assert!(!text.contains(&unmatched.program.name), "n={n}: {text}");
            }
        }
    }

    #[test]
    fn fallback_phrasing_by_count() {
        assert!(fallback_reply(&[]).contains("couldn't find any schemes"));

        let one = fallback_reply(&[program("a", "Alpha")]);
        assert!(one.contains("**Alpha**"));
        assert!(one.contains("Alpha benefits"));

        let three = fallback_reply(&[program("a", "Alpha"), program("b", "Beta"), program("c", "Gamma")]);
        assert!(three.contains("3 schemes: **Alpha**, **Beta**, **Gamma**"));

        let four: Vec<_> = ["A", "B", "C", "D"].iter().map(|n| program(n, n)).collect();
        let many = fallback_reply(&four);
        assert!(many.contains("**4 government schemes**"));
        assert!(!many.contains("**A**"));
    }

    #[test]
    fn restart_commands() {
        assert!(is_restart_command("restart"));
        assert!(is_restart_command("  Start over! "));
        assert!(is_restart_command("RESET."));
        assert!(!is_restart_command("please restart my application"));
        assert!(!is_restart_command("20"));
    }

    #[test]
    fn preambles_name_ambiguous_candidates() {
        let text = failure_preamble(&Rejection::Ambiguous {
            candidates: vec!["Karnataka", "Kerala"],
        });
        assert_eq!(text, "Did you mean Karnataka or Kerala? Please name just one.");
        assert!(failure_preamble(&Rejection::AgeOutOfRange { min: 1, max: 120 }).contains("1 and 120"));
    }
}
