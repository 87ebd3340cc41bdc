//! Question state machine: tracks which profile question is pending.

use serde::{Deserialize, Serialize};

/// The pending question of a conversation.
///
/// Progresses linearly: Age → Income → Region → Category → Complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingQuestion {
    #[default]
    Age,
    Income,
    Region,
    Category,
    Complete,
}

impl PendingQuestion {
    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: PendingQuestion) -> bool {
        use PendingQuestion::*;
        matches!(
            (self, target),
            (Age, Income) | (Income, Region) | (Region, Category) | (Category, Complete)
        )
    }

    /// Whether this state is terminal (profile collection is done).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete)
    }

    /// Get the next state in the linear progression, if any.
    pub fn next(&self) -> Option<PendingQuestion> {
        use PendingQuestion::*;
        match self {
            Age => Some(Income),
            Income => Some(Region),
            Region => Some(Category),
            Category => Some(Complete),
            Complete => None,
        }
    }
}

impl std::fmt::Display for PendingQuestion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Age => "age",
            Self::Income => "income",
            Self::Region => "region",
            Self::Category => "category",
            Self::Complete => "complete",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_transitions() {
        use PendingQuestion::*;
        for (from, to) in [(Age, Income), (Income, Region), (Region, Category), (Category, Complete)] {
            assert!(from.can_transition_to(to), "{from} should transition to {to}");
        }
    }

    #[test]
    fn invalid_transitions() {
        use PendingQuestion::*;
        // Skip
        assert!(!Age.can_transition_to(Region));
        assert!(!Income.can_transition_to(Complete));
        // Backward
        assert!(!Region.can_transition_to(Income));
        assert!(!Complete.can_transition_to(Age));
        // Self
        assert!(!Category.can_transition_to(Category));
    }

    #[test]
    fn next_walks_all_states() {
        use PendingQuestion::*;
        let mut current = PendingQuestion::default();
        assert_eq!(current, Age);
        for expected in [Income, Region, Category, Complete] {
            let next = current.next().unwrap();
            assert!(current.can_transition_to(next));
            assert_eq!(next, expected);
            current = next;
        }
        assert!(current.is_terminal());
        assert!(current.next().is_none());
    }

    #[test]
    fn display_matches_serde() {
        use PendingQuestion::*;
        for q in [Age, Income, Region, Category, Complete] {
            let json = serde_json::to_string(&q).unwrap();
            assert_eq!(format!("\"{q}\""), json);
        }
    }
}
