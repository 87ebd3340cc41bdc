//! Google Gemini `generateContent` client.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::ExplanationGenerator;
use crate::eligibility::EligibilityMatch;
use crate::error::LlmError;
use crate::profile::CompleteProfile;
use crate::session::{HistoryEntry, Role};

const PROVIDER: &str = "gemini";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// At most this many schemes are described in the system instruction.
const PROMPT_SCHEME_LIMIT: usize = 5;
/// At most this many history messages are sent as context.
const PROMPT_HISTORY_LIMIT: usize = 5;

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: SecretString,
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl GeminiConfig {
    pub fn new(api_key: SecretString, model: impl Into<String>) -> Self {
        Self {
            api_key,
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            temperature: 0.3,
            max_output_tokens: 500,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

/// Explanation generator backed by the Gemini REST API.
pub struct GeminiExplainer {
    config: GeminiConfig,
    client: reqwest::Client,
}

impl GeminiExplainer {
    pub fn new(config: GeminiConfig) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| LlmError::RequestFailed {
                provider: PROVIDER.to_string(),
                reason: format!("Failed to create HTTP client: {e}"),
            })?;
        tracing::info!("Using Gemini (model: {})", config.model);
        Ok(Self { config, client })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url, self.config.model
        )
    }

    fn build_request(
        &self,
        matches: &[EligibilityMatch],
        history: &[HistoryEntry],
    ) -> GenerateRequest {
        GenerateRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: system_instruction(matches),
                }],
            },
            contents: conversation_contents(history),
            generation_config: GenerationConfig {
                temperature: self.config.temperature,
                max_output_tokens: self.config.max_output_tokens,
            },
        }
    }
}

#[async_trait]
impl ExplanationGenerator for GeminiExplainer {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn generate(
        &self,
        _profile: &CompleteProfile,
        matches: &[EligibilityMatch],
        history: &[HistoryEntry],
    ) -> Result<String, LlmError> {
        let body = self.build_request(matches, history);
        debug!(model = %self.config.model, schemes = matches.len(), "Sending generateContent request");

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", self.config.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed {
                provider: PROVIDER.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(LlmError::RateLimited {
                provider: PROVIDER.to_string(),
            });
        }
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %error_body, "Gemini returned error");
            return Err(LlmError::RequestFailed {
                provider: PROVIDER.to_string(),
                reason: format!("HTTP {status}"),
            });
        }

        let parsed: GenerateResponse =
            response
                .json()
                .await
                .map_err(|e| LlmError::InvalidResponse {
                    provider: PROVIDER.to_string(),
                    reason: format!("Failed to parse response: {e}"),
                })?;

        parsed.text().ok_or_else(|| LlmError::InvalidResponse {
            provider: PROVIDER.to_string(),
            reason: "No text in response candidates".to_string(),
        })
    }
}

/// System instruction naming only the schemes the user matched.
pub fn system_instruction(matches: &[EligibilityMatch]) -> String {
    let scheme_info = matches
        .iter()
        .take(PROMPT_SCHEME_LIMIT)
        .map(|m| format!("Scheme: {}\nBenefits: {}", m.program.name, m.program.benefits))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "You are BharatConnect AI, a helpful assistant for Indian government scholarship schemes.

Your role:
- Help users understand which schemes they're eligible for
- Explain scheme benefits clearly and concisely
- Guide users through the application process
- Be encouraging and supportive

Important guidelines:
- ONLY discuss the schemes provided below. Do not make up schemes.
- Keep responses conversational and friendly
- Use simple language suitable for students
- Be concise (2-3 sentences maximum)

Eligible schemes for this user:
{scheme_info}

Current context: The user is eligible for {} scheme(s).
",
        matches.len()
    )
}

/// The last few history messages in Gemini's role vocabulary, always ending
/// on a user turn.
fn conversation_contents(history: &[HistoryEntry]) -> Vec<Content> {
    let start = history.len().saturating_sub(PROMPT_HISTORY_LIMIT);
    let mut contents: Vec<Content> = history[start..]
        .iter()
        .map(|entry| Content {
            role: Some(match entry.role {
                Role::User => "user",
                Role::Assistant => "model",
            }),
            parts: vec![Part {
                text: entry.content.clone(),
            }],
        })
        .collect();

    if contents.last().and_then(|c| c.role) != Some("user") {
        contents.push(Content {
            role: Some("user"),
            parts: vec![Part {
                text: "Explain the schemes I am eligible for.".to_string(),
            }],
        });
    }
    contents
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    system_instruction: Content,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate, if non-blank.
    fn text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().map(|p| p.text).collect();
        let trimmed = text.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }
}
