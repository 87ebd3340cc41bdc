use std::convert::Infallible;
use std::net::SocketAddr;

use axum::Json;
use axum::extract::{ConnectInfo, FromRequestParts, State};
use axum::http::request::Parts;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, warn};

use super::{ApiError, AppState};
use crate::catalog::ProgramRecord;
use crate::conversation::{TurnOutcome, TurnRequest};
use crate::delivery::DeliveryReceipt;
use crate::eligibility::{EligibilityMatch, match_programs};
use crate::governor::Admission;
use crate::profile::{CompleteProfile, UserProfile};

/// Caller address for per-client rate limiting: the socket peer when the
/// server was started with connect info, else the first `X-Forwarded-For`
/// hop, else `"unknown"`.
pub struct ClientAddr(pub String);

impl<S> FromRequestParts<S> for ClientAddr
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(ConnectInfo(addr)) = parts.extensions.get::<ConnectInfo<SocketAddr>>() {
            return Ok(Self(addr.ip().to_string()));
        }
        let forwarded = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        Ok(Self(forwarded.unwrap_or_else(|| "unknown".to_string())))
    }
}

/// One matched program as returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchView {
    pub id: String,
    pub name: String,
    pub benefits: String,
    pub reason: String,
    pub apply_url: String,
    pub required_documents: Vec<String>,
}

impl From<EligibilityMatch> for MatchView {
    fn from(m: EligibilityMatch) -> Self {
        Self {
            id: m.program.id,
            name: m.program.name,
            benefits: m.program.benefits,
            reason: m.reason,
            apply_url: m.program.apply_url,
            required_documents: m.program.required_documents,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub session_id: String,
    pub message: String,
    #[serde(default, alias = "user_profile")]
    pub known_profile: Option<UserProfile>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub reply_text: String,
    pub matches: Vec<MatchView>,
    pub next_prompt: Option<String>,
    pub rate_limited: bool,
}

#[derive(Debug, Deserialize)]
pub struct EligibilityRequest {
    pub age: u32,
    pub income: u64,
    pub state: String,
    pub category: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EligibilityResponse {
    pub eligible_schemes: Vec<MatchView>,
    pub count: usize,
}

#[derive(Debug, Deserialize)]
pub struct SmsRequest {
    pub phone: String,
    pub scheme_id: String,
}

pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "BharatConnect AI Backend API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "health": "/health",
            "chat": "/chat",
            "eligibility": "/eligibility",
            "sms": "/sms",
            "schemes": "/schemes",
        }
    }))
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let catalog = match state.catalog.list_active_programs().await {
        Ok(programs) if !programs.is_empty() => "ok",
        Ok(_) => "empty",
        Err(e) => {
            warn!("Catalog unavailable during health check: {}", e);
            "empty"
        }
    };
    let llm = if state.engine.generator_name().is_some() {
        "ok"
    } else {
        "fallback"
    };
    let sms = if state.delivery.backend().is_live() {
        "ok"
    } else {
        "mock"
    };
    Json(json!({
        "status": "healthy",
        "services": {"llm": llm, "sms": sms, "catalog": catalog},
    }))
}

pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let outcome = state
        .engine
        .handle_turn(TurnRequest {
            session_key: request.session_id,
            message: request.message,
            known_fields: request.known_profile,
        })
        .await?;

    match outcome {
        TurnOutcome::Reply(reply) => Ok(Json(ChatResponse {
            reply_text: reply.reply_text,
            matches: reply.matches.into_iter().map(MatchView::from).collect(),
            next_prompt: reply.next_prompt,
            rate_limited: false,
        })),
        TurnOutcome::RateLimited { retry_after } => Err(ApiError::rate_limited(retry_after)),
    }
}

pub async fn eligibility(
    State(state): State<AppState>,
    ClientAddr(client): ClientAddr,
    Json(request): Json<EligibilityRequest>,
) -> Result<Json<EligibilityResponse>, ApiError> {
    if let Admission::Denied { retry_after } = state.eligibility_governor.admit(&client) {
        return Err(ApiError::rate_limited(retry_after));
    }

    let bounds = &state.engine.settings().validator;
    if request.age < bounds.age_min || request.age > bounds.age_max {
        return Err(ApiError::InvalidInput(format!(
            "age must be between {} and {}",
            bounds.age_min, bounds.age_max
        )));
    }

    let profile = CompleteProfile {
        age: request.age,
        income: request.income,
        region: request.state,
        category: request.category,
    };
    let programs = state.catalog.list_active_programs().await?;
    let matches = match_programs(&profile, &programs);
    debug!(client = %client, count = matches.len(), "Direct eligibility check");

    let eligible_schemes: Vec<MatchView> = matches.into_iter().map(MatchView::from).collect();
    Ok(Json(EligibilityResponse {
        count: eligible_schemes.len(),
        eligible_schemes,
    }))
}

pub async fn sms(
    State(state): State<AppState>,
    Json(request): Json<SmsRequest>,
) -> Result<Json<DeliveryReceipt>, ApiError> {
    let receipt = state.delivery.send(&request.phone, &request.scheme_id).await?;
    Ok(Json(receipt))
}

pub async fn schemes(State(state): State<AppState>) -> Result<Json<Vec<ProgramRecord>>, ApiError> {
    let programs = state.catalog.list_active_programs().await?;
    Ok(Json(programs.to_vec()))
}
