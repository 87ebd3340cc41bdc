//! Session store: keyed, time-limited conversation state.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::model::{Session, SessionKey};
use crate::error::StoreError;

/// Default idle timeout before a session is evicted.
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Default upper bound on concurrently stored sessions.
pub const DEFAULT_MAX_SESSIONS: usize = 100_000;

/// Backend-agnostic session storage.
///
/// Expired sessions must be indistinguishable from absent ones. Callers
/// serialize turns per key with [`super::SessionLocks`]; the store itself
/// only guarantees that each call is atomic.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Return the live session for `key`, or a fresh one if it is absent or
    /// expired. The returned value is a snapshot; persist it with [`save`].
    ///
    /// [`save`]: SessionStore::save
    async fn get_or_create(&self, key: &SessionKey) -> Result<Session, StoreError>;

    /// Persist `session` under `key`, replacing any previous value.
    async fn save(&self, key: &SessionKey, session: Session) -> Result<(), StoreError>;

    /// Forget `key` entirely.
    async fn remove(&self, key: &SessionKey) -> Result<(), StoreError>;

    /// Drop every expired session. Returns the number evicted.
    async fn evict_expired(&self) -> usize;

    /// Number of stored sessions (live or not yet swept).
    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// In-memory session store.
///
/// Holds at most `max_sessions` entries. Creating a session beyond that
/// first evicts expired ones and fails with [`StoreError::Unavailable`] if
/// the store is still full.
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<SessionKey, Session>>,
    timeout: Duration,
    max_sessions: usize,
}

impl InMemorySessionStore {
    pub fn new(timeout: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            timeout,
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }

    pub fn with_max_sessions(mut self, max_sessions: usize) -> Self {
        self.max_sessions = max_sessions;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_TIMEOUT)
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get_or_create(&self, key: &SessionKey) -> Result<Session, StoreError> {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;

        if let Some(existing) = sessions.get(key) {
            if !existing.is_expired(now, self.timeout) {
                let mut session = existing.clone();
                session.touch();
                return Ok(session);
            }
            debug!(session = %key, "Session expired, starting fresh");
            sessions.remove(key);
        }

        if sessions.len() >= self.max_sessions {
            sessions.retain(|_, s| !s.is_expired(now, self.timeout));
            if sessions.len() >= self.max_sessions {
                warn!(max = self.max_sessions, "Session store full");
                return Err(StoreError::Unavailable(format!(
                    "session limit of {} reached",
                    self.max_sessions
                )));
            }
        }

        let session = Session::new();
        sessions.insert(key.clone(), session.clone());
        debug!(session = %key, "Session created");
        Ok(session)
    }

    async fn save(&self, key: &SessionKey, mut session: Session) -> Result<(), StoreError> {
        session.touch();
        self.sessions.write().await.insert(key.clone(), session);
        Ok(())
    }

    async fn remove(&self, key: &SessionKey) -> Result<(), StoreError> {
        self.sessions.write().await.remove(key);
        Ok(())
    }

    async fn evict_expired(&self) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired(now, self.timeout));
        let evicted = before - sessions.len();
        if evicted > 0 {
            info!(count = evicted, "Evicted expired sessions");
        }
        evicted
    }

    async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

/// Spawn a background task that periodically evicts expired sessions.
pub fn spawn_sweep_task(
    store: Arc<dyn SessionStore>,
    every: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            store.evict_expired().await;
        }
    })
}
