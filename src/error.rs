//! Error types for BharatConnect.

use std::time::Duration;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("Session store error: {0}")]
    Store(#[from] StoreError),

    #[error("Eligibility error: {0}")]
    Eligibility(#[from] EligibilityError),

    #[error("Turn error: {0}")]
    Turn(#[from] TurnError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Program catalog errors.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Failed to read catalog from {path}: {reason}")]
    Load { path: String, reason: String },

    #[error("Failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Duplicate program id: {id}")]
    DuplicateId { id: String },

    #[error("Program {id} is invalid: {reason}")]
    InvalidRecord { id: String, reason: String },
}

/// Explanation generator (LLM) errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} rate limited")]
    RateLimited { provider: String },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Provider {provider} timed out after {timeout:?}")]
    Timeout { provider: String, timeout: Duration },
}

/// Message delivery (SMS) errors.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("Invalid phone number: {0}")]
    InvalidRecipient(String),

    #[error("Program {id} not found")]
    NotFound { id: String },

    #[error("Delivery rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("Delivery via {provider} failed: {reason}")]
    SendFailed { provider: String, reason: String },

    #[error("Delivery via {provider} timed out after {timeout:?}")]
    Timeout { provider: String, timeout: Duration },

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
}

/// Session store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Session backend unavailable: {0}")]
    Unavailable(String),
}

/// Eligibility matcher errors.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EligibilityError {
    #[error("Profile is incomplete, missing: {}", missing.join(", "))]
    IncompleteProfile { missing: Vec<&'static str> },
}

/// Errors that abort a conversation turn.
///
/// Validation failures and collaborator outages are not errors; they degrade
/// into a normal reply.
#[derive(Debug, thiserror::Error)]
pub enum TurnError {
    #[error("Malformed session key: {0}")]
    SessionKeyMalformed(String),

    #[error("Session store error: {0}")]
    Store(#[from] StoreError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Eligibility error: {0}")]
    Eligibility(#[from] EligibilityError),

    #[error("Session state transition failed: {0}")]
    StateTransition(String),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
