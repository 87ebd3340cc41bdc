//! Session data model.

use std::sync::LazyLock;
use std::time::Duration;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use super::state::PendingQuestion;
use crate::error::TurnError;
use crate::profile::UserProfile;

/// Lowercase hyphenated UUID, the only accepted session key shape.
static SESSION_KEY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-f0-9\-]{36}$").expect("session key pattern"));

/// Opaque, format-checked session identifier.
///
/// Parsing happens before any store access so arbitrary strings can never
/// create or address a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey(String);

impl SessionKey {
    pub fn parse(raw: &str) -> Result<Self, TurnError> {
        if SESSION_KEY_PATTERN.is_match(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(TurnError::SessionKeyMalformed(
                "session_id must be a lowercase UUID".to_string(),
            ))
        }
    }

    /// A new random key.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who produced a history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One message of the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
    pub at: DateTime<Utc>,
}

/// A validated answer to one profile question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Age(u32),
    Income(u64),
    Region(String),
    Category(String),
}

impl Answer {
    /// The question this answer belongs to.
    pub fn question(&self) -> PendingQuestion {
        match self {
            Self::Age(_) => PendingQuestion::Age,
            Self::Income(_) => PendingQuestion::Income,
            Self::Region(_) => PendingQuestion::Region,
            Self::Category(_) => PendingQuestion::Category,
        }
    }
}

/// Per-conversation state.
#[derive(Debug, Clone)]
pub struct Session {
    pub profile: UserProfile,
    pub pending: PendingQuestion,
    /// Append-only for the life of the session.
    pub history: Vec<HistoryEntry>,
    pub created_at: DateTime<Utc>,
    pub last_accessed: Instant,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            profile: UserProfile::default(),
            pending: PendingQuestion::default(),
            history: Vec::new(),
            created_at: Utc::now(),
            last_accessed: Instant::now(),
        }
    }

    /// Whether nothing has been said in this session yet.
    pub fn is_fresh(&self) -> bool {
        self.history.is_empty()
    }

    pub fn is_expired(&self, now: Instant, timeout: Duration) -> bool {
        now.duration_since(self.last_accessed) > timeout
    }

    pub fn touch(&mut self) {
        self.last_accessed = Instant::now();
    }

    pub fn record(&mut self, role: Role, content: impl Into<String>) {
        self.history.push(HistoryEntry {
            role,
            content: content.into(),
            at: Utc::now(),
        });
    }

    /// Store an answer to the pending question and advance.
    ///
    /// Fails without mutating anything if the answer is for a different
    /// question than the pending one.
    pub fn accept(&mut self, answer: Answer) -> Result<PendingQuestion, String> {
        let question = answer.question();
        if question != self.pending {
            return Err(format!(
                "Answer for {question} while {} is pending",
                self.pending
            ));
        }
        let next = self
            .pending
            .next()
            .ok_or_else(|| "Already at terminal state".to_string())?;
        if !self.pending.can_transition_to(next) {
            return Err(format!("Cannot transition from {} to {next}", self.pending));
        }

        match answer {
            Answer::Age(age) => self.profile.age = Some(age),
            Answer::Income(income) => self.profile.income = Some(income),
            Answer::Region(region) => self.profile.region = Some(region),
            Answer::Category(category) => self.profile.category = Some(category),
        }
        self.pending = next;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_key_accepts_lowercase_uuid() {
        let raw = "3f2b8c1e-9a4d-4e6f-8b2a-1c3d5e7f9a0b";
        assert_eq!(SessionKey::parse(raw).unwrap().as_str(), raw);
        assert!(SessionKey::parse(SessionKey::generate().as_str()).is_ok());
    }

    #[test]
    fn session_key_rejects_other_shapes() {
        for raw in [
            "",
            "abc",
            "3F2B8C1E-9A4D-4E6F-8B2A-1C3D5E7F9A0B",
            "3f2b8c1e9a4d4e6f8b2a1c3d5e7f9a0b",
            "../../etc/passwd-0000000000000000000000",
            "3f2b8c1e-9a4d-4e6f-8b2a-1c3d5e7f9a0b ",
        ] {
            assert!(
                matches!(SessionKey::parse(raw), Err(TurnError::SessionKeyMalformed(_))),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn accept_walks_all_questions() {
        let mut s = Session::new();
        assert_eq!(s.accept(Answer::Age(20)).unwrap(), PendingQuestion::Income);
        assert_eq!(s.accept(Answer::Income(0)).unwrap(), PendingQuestion::Region);
        assert_eq!(
            s.accept(Answer::Region("Goa".into())).unwrap(),
            PendingQuestion::Category
        );
        assert_eq!(
            s.accept(Answer::Category("SC".into())).unwrap(),
            PendingQuestion::Complete
        );
        assert!(s.profile.is_complete());
    }

    #[test]
    fn accept_rejects_out_of_order_answer() {
        let mut s = Session::new();
        assert!(s.accept(Answer::Income(5)).is_err());
        assert_eq!(s.pending, PendingQuestion::Age);
        assert_eq!(s.profile, UserProfile::default());
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_is_strictly_after_timeout() {
        let s = Session::new();
        let timeout = Duration::from_secs(30 * 60);
        tokio::time::advance(timeout).await;
        assert!(!s.is_expired(Instant::now(), timeout));
        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(s.is_expired(Instant::now(), timeout));
    }

    #[test]
    fn record_appends_in_order() {
        let mut s = Session::new();
        assert!(s.is_fresh());
        s.record(Role::User, "hi");
        s.record(Role::Assistant, "hello");
        assert_eq!(s.history.len(), 2);
        assert_eq!(s.history[0].role, Role::User);
        assert_eq!(s.history[1].content, "hello");
    }
}
