//! Explanation generation for completed profiles.
//!
//! The conversation engine only depends on [`ExplanationGenerator`]; the
//! Gemini REST client is one implementation. Any failure here is recovered by
//! the engine's deterministic fallback, so implementations report errors
//! instead of retrying.

pub mod gemini;

pub use gemini::{GeminiConfig, GeminiExplainer};

use async_trait::async_trait;

use crate::eligibility::EligibilityMatch;
use crate::error::LlmError;
use crate::profile::CompleteProfile;
use crate::session::HistoryEntry;

/// Produces a natural-language explanation of a match result.
#[async_trait]
pub trait ExplanationGenerator: Send + Sync {
    /// Short provider name for logs and health reporting.
    fn name(&self) -> &str;

    /// Explain `matches` to the user. `history` is the conversation so far,
    /// oldest first, ending with the user's latest message.
    async fn generate(
        &self,
        profile: &CompleteProfile,
        matches: &[EligibilityMatch],
        history: &[HistoryEntry],
    ) -> Result<String, LlmError>;
}
