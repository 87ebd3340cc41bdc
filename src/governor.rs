//! Rate governor: in-memory sliding-window admission control.
//!
//! Tracks request instants per key (session id, phone number, client
//! address). State is split across independently locked shards so admits on
//! different keys rarely contend; the check-and-record for one key happens
//! inside a single shard critical section.
//!
//! Keys whose window has fully expired are pruned opportunistically (each
//! shard sweeps itself at most once per window during `admit`) and by
//! [`RateGovernor::sweep`], which [`spawn_sweep_task`] calls periodically.

use std::collections::{HashMap, VecDeque};
use std::hash::BuildHasher;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

/// Number of independently locked shards.
const SHARD_COUNT: usize = 16;

/// Outcome of an admission check. Denial is a normal result, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Request recorded; `remaining` more fit in the current window.
    Allowed { remaining: usize },
    /// Window is full; the oldest request leaves it after `retry_after`.
    Denied { retry_after: Duration },
}

impl Admission {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }

    /// Hint for a `Retry-After` header, rounded up to whole seconds.
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            Self::Allowed { .. } => None,
            Self::Denied { retry_after } => {
                let secs = retry_after.as_secs();
                Some(if retry_after.subsec_nanos() > 0 { secs + 1 } else { secs.max(1) })
            }
        }
    }
}

/// Limits for one governor instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    pub max_requests: usize,
    pub window: Duration,
}

impl RateLimit {
    pub fn per_minute(max_requests: usize) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(60),
        }
    }
}

#[derive(Default)]
struct Shard {
    windows: HashMap<String, VecDeque<Instant>>,
    last_sweep: Option<Instant>,
}

impl Shard {
    /// Drop every key with no instants inside the window. Returns keys removed.
    fn prune(&mut self, now: Instant, window: Duration) -> usize {
        let before = self.windows.len();
        self.windows.retain(|_, instants| {
            drop_expired(instants, now, window);
            !instants.is_empty()
        });
        self.last_sweep = Some(now);
        before - self.windows.len()
    }
}

fn drop_expired(instants: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(oldest) = instants.front() {
        if now.duration_since(*oldest) >= window {
            instants.pop_front();
        } else {
            break;
        }
    }
}

/// Sliding-window rate governor. One instance per call-site category.
pub struct RateGovernor {
    name: &'static str,
    limit: RateLimit,
    shards: Box<[Mutex<Shard>]>,
    hasher: std::collections::hash_map::RandomState,
}

impl RateGovernor {
    /// Create a governor. `name` labels log lines ("chat", "sms", ...).
    pub fn new(name: &'static str, limit: RateLimit) -> Self {
        let shards = (0..SHARD_COUNT)
            .map(|_| Mutex::new(Shard::default()))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            name,
            limit,
            shards,
            hasher: Default::default(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn limit(&self) -> RateLimit {
        self.limit
    }

    fn shard_for(&self, key: &str) -> &Mutex<Shard> {
        let idx = (self.hasher.hash_one(key) as usize) % self.shards.len();
        &self.shards[idx]
    }

    /// Check and, if allowed, record a request for `key`.
    pub fn admit(&self, key: &str) -> Admission {
        let now = Instant::now();
        let window = self.limit.window;
        let mut shard = self
            .shard_for(key)
            .lock()
            .unwrap_or_else(|e| e.into_inner());

        let due = shard
            .last_sweep
            .is_none_or(|last| now.duration_since(last) >= window);
        if due {
            let removed = shard.prune(now, window);
            if removed > 0 {
                debug!(governor = self.name, removed, "Pruned idle rate windows");
            }
        }

        let instants = shard.windows.entry(key.to_string()).or_default();
        drop_expired(instants, now, window);

        if instants.len() >= self.limit.max_requests {
            let retry_after = instants
                .front()
                .map(|oldest| window.saturating_sub(now.duration_since(*oldest)))
                .unwrap_or(window);
            warn!(
                governor = self.name,
                key = %key.chars().take(20).collect::<String>(),
                retry_after_ms = retry_after.as_millis() as u64,
                "Rate limit exceeded"
            );
            return Admission::Denied { retry_after };
        }

        instants.push_back(now);
        Admission::Allowed {
            remaining: self.limit.max_requests - instants.len(),
        }
    }

    /// Prune every key whose window has fully expired. Returns keys removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let removed: usize = self
            .shards
            .iter()
            .map(|s| s.lock().unwrap_or_else(|e| e.into_inner()).prune(now, self.limit.window))
            .sum();
        if removed > 0 {
            debug!(governor = self.name, removed, "Swept idle rate windows");
        }
        removed
    }

    /// Number of keys currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.shards
            .iter()
            .map(|s| s.lock().unwrap_or_else(|e| e.into_inner()).windows.len())
            .sum()
    }
}

/// Spawn a background task that sweeps the governor once per window.
pub fn spawn_sweep_task(governor: Arc<RateGovernor>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(governor.limit.window);
        loop {
            interval.tick().await;
            governor.sweep();
        }
    })
}
