//! ConversationEngine: drives one turn of profile collection.
//!
//! A turn is: key check, admission, per-key lock, load, interpret, match on
//! completion, explain, save. Everything that can fail after the session is
//! loaded happens before `save`, so an aborted turn leaves the stored
//! session exactly as it was.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::prompts::{
    WELCOME, completed_notice, failure_preamble, fallback_reply, is_restart_command,
    question_prompt,
};
use super::validate::AnswerValidator;
use crate::catalog::CatalogProvider;
use crate::eligibility::{EligibilityMatch, match_programs};
use crate::error::{LlmError, TurnError};
use crate::governor::{Admission, RateGovernor};
use crate::llm::ExplanationGenerator;
use crate::profile::{CompleteProfile, UserProfile};
use crate::safety::sanitize_response;
use crate::session::{
    HistoryEntry, PendingQuestion, Role, Session, SessionKey, SessionLocks, SessionStore,
};

pub const DEFAULT_GENERATOR_TIMEOUT: Duration = Duration::from_secs(10);

/// Per-deployment behavior of the engine.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub validator: AnswerValidator,
    /// Whether "restart" re-opens a completed session.
    pub allow_restart: bool,
    pub generator_timeout: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            validator: AnswerValidator::default(),
            allow_restart: true,
            generator_timeout: DEFAULT_GENERATOR_TIMEOUT,
        }
    }
}

/// One inbound chat message.
#[derive(Debug, Clone, Default)]
pub struct TurnRequest {
    pub session_key: String,
    pub message: String,
    /// Profile values the client already knows.
    pub known_fields: Option<UserProfile>,
}

/// What the user sees after a turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnReply {
    pub reply_text: String,
    /// Non-empty only on the turn that completed the profile.
    pub matches: Vec<EligibilityMatch>,
    /// The pending question's prompt; `None` once the profile is complete.
    pub next_prompt: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    Reply(TurnReply),
    /// Admission denied. The session was not touched.
    RateLimited { retry_after: Duration },
}

/// Coordinates sessions, validators, the matcher and the explanation
/// generator.
pub struct ConversationEngine {
    store: Arc<dyn SessionStore>,
    catalog: Arc<dyn CatalogProvider>,
    governor: Arc<RateGovernor>,
    generator: Option<Arc<dyn ExplanationGenerator>>,
    locks: SessionLocks,
    settings: EngineSettings,
}

impl ConversationEngine {
    pub fn new(
        store: Arc<dyn SessionStore>,
        catalog: Arc<dyn CatalogProvider>,
        governor: Arc<RateGovernor>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            store,
            catalog,
            governor,
            generator: None,
            locks: SessionLocks::new(),
            settings,
        }
    }

    pub fn with_generator(mut self, generator: Arc<dyn ExplanationGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Name of the configured explanation generator, if any.
    pub fn generator_name(&self) -> Option<&str> {
        self.generator.as_deref().map(|g| g.name())
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Process one chat message.
    pub async fn handle_turn(&self, request: TurnRequest) -> Result<TurnOutcome, TurnError> {
        let key = SessionKey::parse(&request.session_key)?;

        if let Admission::Denied { retry_after } = self.governor.admit(key.as_str()) {
            return Ok(TurnOutcome::RateLimited { retry_after });
        }

        let _turn = self.locks.lock(&key).await;
        let mut session = self.store.get_or_create(&key).await?;

        let reply = if session.pending.is_terminal() {
            self.completed_turn(&mut session, &request.message)
        } else {
            self.collecting_turn(&key, &mut session, &request).await?
        };

        session.record(Role::Assistant, reply.reply_text.clone());
        self.store.save(&key, session).await?;
        Ok(TurnOutcome::Reply(reply))
    }

    /// Turn against a completed session. Never re-runs matching.
    fn completed_turn(&self, session: &mut Session, message: &str) -> TurnReply {
        if self.settings.allow_restart && is_restart_command(message) {
            info!("Restarting completed session");
            *session = Session::new();
            session.record(Role::User, message);
            let prompt = question_prompt(session.pending).unwrap_or_default();
            return TurnReply {
                reply_text: prompt.to_string(),
                matches: Vec::new(),
                next_prompt: Some(prompt.to_string()),
            };
        }

        session.record(Role::User, message);
        TurnReply {
            reply_text: completed_notice(self.settings.allow_restart).to_string(),
            matches: Vec::new(),
            next_prompt: None,
        }
    }

    async fn collecting_turn(
        &self,
        key: &SessionKey,
        session: &mut Session,
        request: &TurnRequest,
    ) -> Result<TurnReply, TurnError> {
        let was_fresh = session.is_fresh();

        if let Some(known) = &request.known_fields {
            self.apply_known_fields(session, known)?;
        }

        let mut preamble = None;
        if !session.pending.is_terminal() {
            let question = session.pending;
            match self.settings.validator.validate(question, &request.message) {
                Ok(answer) => {
                    session.accept(answer).map_err(TurnError::StateTransition)?;
                }
                Err(rejection) => {
                    debug!(session = %key, %question, %rejection, "Answer rejected");
                    preamble = Some(if was_fresh {
                        WELCOME.to_string()
                    } else {
                        failure_preamble(&rejection)
                    });
                }
            }
        }
        session.record(Role::User, request.message.clone());

        if let Some(prompt) = question_prompt(session.pending) {
            let reply_text = match preamble {
                Some(p) if !p.is_empty() => format!("{p} {prompt}"),
                _ => prompt.to_string(),
            };
            return Ok(TurnReply {
                reply_text,
                matches: Vec::new(),
                next_prompt: Some(prompt.to_string()),
            });
        }

        let profile = session.profile.try_complete()?;
        let catalog = self.catalog.list_active_programs().await?;
        let matches = match_programs(&profile, &catalog);
        info!(
            session = %key,
            region = %profile.region,
            category = %profile.category,
            matches = matches.len(),
            "Profile complete"
        );

        let reply_text = self.explain(&profile, &matches, &session.history).await;
        Ok(TurnReply {
            reply_text,
            matches,
            next_prompt: None,
        })
    }

    /// Fill pending questions from client-supplied values, in question order,
    /// stopping at the first value that is absent or fails validation.
    fn apply_known_fields(
        &self,
        session: &mut Session,
        known: &UserProfile,
    ) -> Result<(), TurnError> {
        loop {
            let question = session.pending;
            let raw = match question {
                PendingQuestion::Age => known.age.map(|v| v.to_string()),
                PendingQuestion::Income => known.income.map(|v| v.to_string()),
                PendingQuestion::Region => known.region.clone(),
                PendingQuestion::Category => known.category.clone(),
                PendingQuestion::Complete => None,
            };
            let Some(raw) = raw else { break };

            match self.settings.validator.validate(question, &raw) {
                Ok(answer) => {
                    session.accept(answer).map_err(TurnError::StateTransition)?;
                }
                Err(rejection) => {
                    debug!(%question, %rejection, "Ignoring invalid known field");
                    break;
                }
            }
        }
        Ok(())
    }

    /// Generator output if it arrives in time and survives sanitization,
    /// otherwise the deterministic fallback.
    async fn explain(
        &self,
        profile: &CompleteProfile,
        matches: &[EligibilityMatch],
        history: &[HistoryEntry],
    ) -> String {
        let Some(generator) = &self.generator else {
            return fallback_reply(matches);
        };

        let timeout = self.settings.generator_timeout;
        let result =
            match tokio::time::timeout(timeout, generator.generate(profile, matches, history))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(LlmError::Timeout {
                    provider: generator.name().to_string(),
                    timeout,
                }),
            };

        match result {
            Ok(text) => {
                let sanitized = sanitize_response(&text);
                if sanitized.was_modified {
                    warn!(provider = generator.name(), "Removed active content from explanation");
                }
                if !sanitized.content.is_empty() {
                    return sanitized.content;
                }
                warn!(provider = generator.name(), "Explanation empty after sanitizing, using fallback");
            }
            Err(e) => {
                warn!(provider = generator.name(), "Explanation failed, using fallback: {}", e);
            }
        }
        fallback_reply(matches)
    }
}
