//! Per-client fixed-window rate limiting.
//!
//! # Responsibilities
//! - Count requests per client identity in fixed windows
//! - Report remaining budget and window reset for response headers
//! - Keep storage behind [`RateLimitStore`] so a shared counter can replace
//!   the in-process map
//!
//! # Design Decisions
//! - Fixed window, not sliding: a burst straddling a window boundary can
//!   admit up to 2x the budget in a short span
//! - Records are never evicted automatically; operators can reset through
//!   the admin API
//! - The in-memory store is only accurate per process instance

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use dashmap::DashMap;

use crate::config::RateLimitConfig;

/// Counting state for one client in its current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowRecord {
    /// Requests observed in the current window (including the latest one).
    pub count: u32,
    /// When the current window began.
    pub window_start: Instant,
}

/// Storage for per-client window records.
pub trait RateLimitStore: Send + Sync + std::fmt::Debug {
    /// Count one request for `key`. Starts a fresh window (count = 1) when no
    /// record exists or the existing window is older than `window`.
    /// Must be atomic per key.
    fn hit(&self, key: &str, now: Instant, window: Duration) -> WindowRecord;

    /// Current record for `key`, if any.
    fn get(&self, key: &str) -> Option<WindowRecord>;

    /// Drop the record for `key`. Returns whether one existed.
    fn reset(&self, key: &str) -> bool;

    /// Drop every record.
    fn clear(&self);

    /// Number of tracked client identities.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of all records, for the admin API.
    fn snapshot(&self) -> Vec<(String, WindowRecord)>;
}

/// Process-local store on a sharded concurrent map.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: DashMap<String, WindowRecord>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RateLimitStore for InMemoryStore {
    fn hit(&self, key: &str, now: Instant, window: Duration) -> WindowRecord {
        // The entry guard holds the shard lock, so read-modify-write is atomic.
        let mut entry = self.records.entry(key.to_string()).or_insert(WindowRecord {
            count: 0,
            window_start: now,
        });

        let record = entry.value_mut();
        if now.saturating_duration_since(record.window_start) > window {
            record.count = 1;
            record.window_start = now;
        } else {
            record.count = record.count.saturating_add(1);
        }
        *record
    }

    fn get(&self, key: &str) -> Option<WindowRecord> {
        self.records.get(key).map(|r| *r.value())
    }

    fn reset(&self, key: &str) -> bool {
        self.records.remove(key).is_some()
    }

    fn clear(&self) {
        self.records.clear();
    }

    fn len(&self) -> usize {
        self.records.len()
    }

    fn snapshot(&self) -> Vec<(String, WindowRecord)> {
        self.records
            .iter()
            .map(|r| (r.key().clone(), *r.value()))
            .collect()
    }
}

/// Window length and per-window budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub window: Duration,
    pub max_requests: u32,
}

impl RateLimitPolicy {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self { window, max_requests }
    }
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self::from(&RateLimitConfig::default())
    }
}

impl From<&RateLimitConfig> for RateLimitPolicy {
    fn from(config: &RateLimitConfig) -> Self {
        Self::new(Duration::from_secs(config.window_secs), config.max_requests)
    }
}

/// Result of counting one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    /// Requests left in this window, never negative.
    pub remaining: u32,
    /// Budget per window.
    pub limit: u32,
    /// When the current window ends.
    pub reset_at: Instant,
    /// Time from the decision until `reset_at`.
    pub reset_after: Duration,
    /// Window length the decision was made under.
    pub window: Duration,
}

impl RateLimitDecision {
    /// Window end as Unix seconds, for `X-RateLimit-Reset`.
    pub fn reset_epoch_secs(&self) -> u64 {
        (SystemTime::now() + self.reset_after)
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }
}

/// Fixed-window rate limiter over a pluggable store.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn RateLimitStore>) -> Self {
        Self { store }
    }

    /// Limiter backed by an [`InMemoryStore`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryStore::new()))
    }

    pub fn store(&self) -> &Arc<dyn RateLimitStore> {
        &self.store
    }

    /// Count a request from `client_id` now.
    pub fn check_and_consume(&self, client_id: &str, policy: RateLimitPolicy) -> RateLimitDecision {
        self.check_and_consume_at(client_id, policy, Instant::now())
    }

    /// Count a request from `client_id` at `now`.
    pub fn check_and_consume_at(
        &self,
        client_id: &str,
        policy: RateLimitPolicy,
        now: Instant,
    ) -> RateLimitDecision {
        let record = self.store.hit(client_id, now, policy.window);
        let reset_at = record.window_start + policy.window;

        RateLimitDecision {
            allowed: record.count <= policy.max_requests,
            remaining: policy.max_requests.saturating_sub(record.count),
            limit: policy.max_requests,
            reset_at,
            reset_after: reset_at.saturating_duration_since(now),
            window: policy.window,
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::in_memory()
    }
}
