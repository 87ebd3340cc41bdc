//! Configuration types.
//!
//! Everything is read from environment variables with defaults. Optional
//! integrations (Gemini, Twilio) are `None` when their credentials are unset.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;

use crate::conversation::{AnswerValidator, EngineSettings, MatchPolicy};
use crate::delivery::{DEFAULT_DELIVERY_TIMEOUT, TwilioConfig};
use crate::error::ConfigError;
use crate::governor::RateLimit;
use crate::llm::GeminiConfig;
use crate::session::{DEFAULT_MAX_SESSIONS, DEFAULT_SESSION_TIMEOUT};

/// HTTP server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec![
                "http://localhost:5173".to_string(),
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:5173".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| ConfigError::InvalidValue {
                key: "BHARAT_HOST".to_string(),
                message: format!("{e}"),
            })
    }
}

/// Session lifetime configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Idle time after which a session is evicted.
    pub timeout: Duration,
    /// How often the background sweep runs.
    pub sweep_interval: Duration,
    /// Upper bound on stored sessions.
    pub max_sessions: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_SESSION_TIMEOUT,
            sweep_interval: Duration::from_secs(60),
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }
}

/// Per-call-site rate limits.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub chat: RateLimit,
    pub sms: RateLimit,
    pub eligibility: RateLimit,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            chat: RateLimit::per_minute(20),
            sms: RateLimit::per_minute(5),
            eligibility: RateLimit::per_minute(30),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub session: SessionConfig,
    pub rate_limits: RateLimitConfig,
    pub engine: EngineSettings,
    /// JSON catalog file. `None` serves the built-in schemes.
    pub catalog_path: Option<PathBuf>,
    pub delivery_timeout: Duration,
    pub gemini: Option<GeminiConfig>,
    pub twilio: Option<TwilioConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            session: SessionConfig::default(),
            rate_limits: RateLimitConfig::default(),
            engine: EngineSettings::default(),
            catalog_path: None,
            delivery_timeout: DEFAULT_DELIVERY_TIMEOUT,
            gemini: None,
            twilio: None,
        }
    }
}

impl AppConfig {
    /// Build config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);
        let defaults = Self::default();

        let server = ServerConfig {
            host: env.string("BHARAT_HOST").unwrap_or(defaults.server.host),
            port: env.parse("BHARAT_PORT")?.unwrap_or(defaults.server.port),
            cors_origins: env
                .list("BHARAT_CORS_ORIGINS")
                .unwrap_or(defaults.server.cors_origins),
        };

        let session = SessionConfig {
            timeout: env
                .positive_minutes("BHARAT_SESSION_TIMEOUT_MINUTES")?
                .unwrap_or(defaults.session.timeout),
            sweep_interval: env
                .positive_secs("BHARAT_SESSION_SWEEP_SECS")?
                .unwrap_or(defaults.session.sweep_interval),
            max_sessions: env
                .positive::<usize>("BHARAT_MAX_SESSIONS")?
                .unwrap_or(defaults.session.max_sessions),
        };

        let rate_limits = RateLimitConfig {
            chat: env
                .parse("BHARAT_CHAT_LIMIT")?
                .map(RateLimit::per_minute)
                .unwrap_or(defaults.rate_limits.chat),
            sms: env
                .parse("BHARAT_SMS_LIMIT")?
                .map(RateLimit::per_minute)
                .unwrap_or(defaults.rate_limits.sms),
            eligibility: env
                .parse("BHARAT_ELIGIBILITY_LIMIT")?
                .map(RateLimit::per_minute)
                .unwrap_or(defaults.rate_limits.eligibility),
        };

        let validator = AnswerValidator {
            age_min: env
                .parse("BHARAT_AGE_MIN")?
                .unwrap_or(defaults.engine.validator.age_min),
            age_max: env
                .parse("BHARAT_AGE_MAX")?
                .unwrap_or(defaults.engine.validator.age_max),
            policy: env
                .parse::<MatchPolicy>("BHARAT_MATCH_POLICY")?
                .unwrap_or(defaults.engine.validator.policy),
        };
        if validator.age_min > validator.age_max {
            return Err(ConfigError::InvalidValue {
                key: "BHARAT_AGE_MIN".to_string(),
                message: format!(
                    "{} is greater than BHARAT_AGE_MAX {}",
                    validator.age_min, validator.age_max
                ),
            });
        }

        let engine = EngineSettings {
            validator,
            allow_restart: env
                .parse("BHARAT_ALLOW_RESTART")?
                .unwrap_or(defaults.engine.allow_restart),
            generator_timeout: env
                .positive_secs("BHARAT_LLM_TIMEOUT_SECS")?
                .unwrap_or(defaults.engine.generator_timeout),
        };

        let gemini = env.string("GOOGLE_API_KEY").map(|key| {
            let model = env
                .string("GEMINI_MODEL")
                .unwrap_or_else(|| "gemini-pro".to_string());
            GeminiConfig::new(SecretString::from(key), model)
        });

        let twilio = match (
            env.string("TWILIO_ACCOUNT_SID"),
            env.string("TWILIO_AUTH_TOKEN"),
            env.string("TWILIO_PHONE_NUMBER"),
        ) {
            (Some(sid), Some(token), Some(from)) => {
                Some(TwilioConfig::new(sid, SecretString::from(token), from))
            }
            _ => None,
        };

        Ok(Self {
            server,
            session,
            rate_limits,
            engine,
            catalog_path: env.string("BHARAT_CATALOG_PATH").map(PathBuf::from),
            delivery_timeout: env
                .positive_secs("BHARAT_DELIVERY_TIMEOUT_SECS")?
                .unwrap_or(defaults.delivery_timeout),
            gemini,
            twilio,
        })
    }
}

/// Typed access to a variable source. Empty values count as unset.
struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse<T>(&self, key: &str) -> Result<Option<T>, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.string(key)
            .map(|raw| {
                raw.parse::<T>().map_err(|e| ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: format!("'{raw}': {e}"),
                })
            })
            .transpose()
    }

    fn positive<T>(&self, key: &str) -> Result<Option<T>, ConfigError>
    where
        T: FromStr + Default + PartialEq,
        T::Err: std::fmt::Display,
    {
        match self.parse::<T>(key)? {
            Some(v) if v == T::default() => Err(ConfigError::InvalidValue {
                key: key.to_string(),
                message: "must be greater than zero".to_string(),
            }),
            other => Ok(other),
        }
    }

    fn positive_secs(&self, key: &str) -> Result<Option<Duration>, ConfigError> {
        Ok(self.positive::<u64>(key)?.map(Duration::from_secs))
    }

    fn positive_minutes(&self, key: &str) -> Result<Option<Duration>, ConfigError> {
        self.positive::<u64>(key)?
            .map(|minutes| {
                minutes
                    .checked_mul(60)
                    .map(Duration::from_secs)
                    .ok_or_else(|| ConfigError::InvalidValue {
                        key: key.to_string(),
                        message: format!("{minutes} minutes is too long"),
                    })
            })
            .transpose()
    }

    fn list(&self, key: &str) -> Option<Vec<String>> {
        let items: Vec<String> = self
            .string(key)?
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        (!items.is_empty()).then_some(items)
    }
}
