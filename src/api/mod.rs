//! HTTP surface: chat, direct eligibility, SMS, catalog and health.

mod error;
mod handlers;

pub use error::ApiError;
pub use handlers::{
    ChatRequest, ChatResponse, EligibilityRequest, EligibilityResponse, MatchView, SmsRequest,
};

use std::sync::Arc;

use axum::Router;
use axum::http::{HeaderValue, Method, header};
use axum::routing::{get, post};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::catalog::{CatalogProvider, StaticCatalog};
use crate::config::AppConfig;
use crate::conversation::ConversationEngine;
use crate::delivery::{DeliveryService, MessageDelivery, MockDelivery, TwilioDelivery};
use crate::governor::RateGovernor;
use crate::llm::GeminiExplainer;
use crate::session::{InMemorySessionStore, SessionStore};

/// Shared state for all routes.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ConversationEngine>,
    pub delivery: Arc<DeliveryService>,
    pub catalog: Arc<dyn CatalogProvider>,
    pub sessions: Arc<dyn SessionStore>,
    pub chat_governor: Arc<RateGovernor>,
    pub sms_governor: Arc<RateGovernor>,
    pub eligibility_governor: Arc<RateGovernor>,
}

impl AppState {
    /// Every governor, for the background sweep.
    pub fn governors(&self) -> [Arc<RateGovernor>; 3] {
        [
            Arc::clone(&self.chat_governor),
            Arc::clone(&self.sms_governor),
            Arc::clone(&self.eligibility_governor),
        ]
    }
}

/// Wire up catalog, sessions, governors and collaborators from config.
pub fn build_state(config: &AppConfig) -> crate::Result<AppState> {
    let catalog: Arc<dyn CatalogProvider> = match &config.catalog_path {
        Some(path) => Arc::new(StaticCatalog::from_file(path)?),
        None => Arc::new(StaticCatalog::builtin()?),
    };

    let sessions: Arc<dyn SessionStore> =
        Arc::new(
            InMemorySessionStore::new(config.session.timeout)
                .with_max_sessions(config.session.max_sessions),
        );

    let chat_governor = Arc::new(RateGovernor::new("chat", config.rate_limits.chat));
    let sms_governor = Arc::new(RateGovernor::new("sms", config.rate_limits.sms));
    let eligibility_governor = Arc::new(RateGovernor::new(
        "eligibility",
        config.rate_limits.eligibility,
    ));

    let mut engine = ConversationEngine::new(
        Arc::clone(&sessions),
        Arc::clone(&catalog),
        Arc::clone(&chat_governor),
        config.engine.clone(),
    );
    match &config.gemini {
        Some(gemini) => {
            engine = engine.with_generator(Arc::new(GeminiExplainer::new(gemini.clone())?));
        }
        None => info!("GOOGLE_API_KEY not set, explanations use templates"),
    }

    let backend: Arc<dyn MessageDelivery> = match &config.twilio {
        Some(twilio) => {
            info!("SMS delivery via Twilio");
            Arc::new(TwilioDelivery::new(twilio.clone()))
        }
        None => {
            info!("Twilio not configured, SMS delivery is mocked");
            Arc::new(MockDelivery)
        }
    };
    let delivery = DeliveryService::new(
        backend,
        Arc::clone(&catalog),
        Arc::clone(&sms_governor),
        config.delivery_timeout,
    );

    Ok(AppState {
        engine: Arc::new(engine),
        delivery: Arc::new(delivery),
        catalog,
        sessions,
        chat_governor,
        sms_governor,
        eligibility_governor,
    })
}

/// Build the router with CORS and request tracing.
pub fn router(state: AppState, cors_origins: &[String]) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);
    let cors = if cors_origins.iter().any(|origin| origin == "*") {
        cors.allow_origin(AllowOrigin::any())
    } else {
        let origins: Vec<HeaderValue> = cors_origins
            .iter()
            .filter_map(|origin| match origin.parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!(%origin, "Ignoring invalid CORS origin: {}", e);
                    None
                }
            })
            .collect();
        cors.allow_origin(AllowOrigin::list(origins))
            .allow_credentials(true)
    };

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/chat", post(handlers::chat))
        .route("/eligibility", post(handlers::eligibility))
        .route("/sms", post(handlers::sms))
        .route("/schemes", get(handlers::schemes))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
