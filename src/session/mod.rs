//! Sessions: per-conversation profile state, its store, and turn locks.

pub mod locks;
pub mod model;
pub mod state;
pub mod store;

pub use locks::{SessionLocks, TurnGuard};
pub use model::{Answer, HistoryEntry, Role, Session, SessionKey};
pub use state::PendingQuestion;
pub use store::{
    DEFAULT_MAX_SESSIONS, DEFAULT_SESSION_TIMEOUT, InMemorySessionStore, SessionStore,
    spawn_sweep_task,
};
