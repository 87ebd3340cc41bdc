//! Conversation engine: collects a profile one question at a time.
//!
//! The engine asks for age, income, state and category in that order,
//! validating each answer before moving on. Once the profile is complete it
//! runs the eligibility matcher and explains the result.

pub mod engine;
pub mod prompts;
pub mod validate;

pub use engine::{
    ConversationEngine, DEFAULT_GENERATOR_TIMEOUT, EngineSettings, TurnOutcome, TurnReply,
    TurnRequest,
};
pub use validate::{AnswerValidator, CATEGORIES, MatchPolicy, REGIONS, Rejection};
