//! Fixed-window request counting per client key.
//!
//! Counter state lives behind [`CounterStore`] so a shared backend can replace
//! the in-process [`MemoryCounterStore`] for multi-instance deployments.

use std::sync::Arc;

use dashmap::DashMap;

/// Chance that a check also sweeps expired windows.
const SWEEP_PROBABILITY: f64 = 0.01;

/// Result of counting one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    pub remaining: u32,
    /// Unix milliseconds at which the current window ends.
    pub reset_at_ms: i64,
}

impl RateDecision {
    /// Whole seconds until the window ends, rounded up, at least 1.
    pub fn retry_after_secs(&self, now_ms: i64) -> u64 {
        let left = (self.reset_at_ms - now_ms).max(0) as u64;
        left.div_ceil(1000).max(1)
    }
}

/// Counter state for one key's current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowCount {
    pub count: u32,
    pub reset_at_ms: i64,
}

/// Atomic per-key counters with expiry.
pub trait CounterStore: Send + Sync {
    /// Count one request for `key`. A missing or expired window
    /// (`now_ms >= reset_at_ms`) restarts at 1 with a fresh reset time.
    fn increment(&self, key: &str, now_ms: i64, window_ms: i64) -> WindowCount;

    /// Drop every window that has expired at `now_ms`.
    fn remove_expired(&self, now_ms: i64);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Process-local store. Counts are lost on restart and not shared between
/// instances.
#[derive(Debug, Default)]
pub struct MemoryCounterStore {
    windows: DashMap<String, WindowCount>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CounterStore for MemoryCounterStore {
    fn increment(&self, key: &str, now_ms: i64, window_ms: i64) -> WindowCount {
        let mut entry = self.windows.entry(key.to_string()).or_insert(WindowCount {
            count: 0,
            reset_at_ms: now_ms.saturating_add(window_ms),
        });
        if now_ms >= entry.reset_at_ms {
            *entry = WindowCount {
                count: 0,
                reset_at_ms: now_ms.saturating_add(window_ms),
            };
        }
        entry.count = entry.count.saturating_add(1);
        *entry
    }

    fn remove_expired(&self, now_ms: i64) {
        let before = self.windows.len();
        self.windows.retain(|_, window| now_ms < window.reset_at_ms);
        let removed = before.saturating_sub(self.windows.len());
        if removed > 0 {
            tracing::debug!(removed, "swept expired rate-limit windows");
        }
    }

    fn len(&self) -> usize {
        self.windows.len()
    }
}

/// Fixed-window limiter: at most `max_requests` per `window_ms` per key.
pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
    max_requests: u32,
    window_ms: i64,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn CounterStore>, max_requests: u32, window_secs: u64) -> Self {
        Self {
            store,
            max_requests,
            window_ms: i64::try_from(window_secs.saturating_mul(1000)).unwrap_or(i64::MAX),
        }
    }

    /// In-memory limiter.
    pub fn in_memory(max_requests: u32, window_secs: u64) -> Self {
        Self::new(Arc::new(MemoryCounterStore::new()), max_requests, window_secs)
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn check(&self, key: &str) -> RateDecision {
        let now = now_ms();
        if rand::random::<f64>() < SWEEP_PROBABILITY {
            self.store.remove_expired(now);
        }
        self.check_at(key, now)
    }

    /// Count a request at an explicit instant. No sweeping.
    pub fn check_at(&self, key: &str, now_ms: i64) -> RateDecision {
        let window = self.store.increment(key, now_ms, self.window_ms);
        let allowed = window.count <= self.max_requests;
        RateDecision {
            allowed,
            remaining: if allowed {
                self.max_requests - window.count
            } else {
                0
            },
            reset_at_ms: window.reset_at_ms,
        }
    }
}

/// Current time as unix milliseconds.
pub fn now_ms() -> i64 {
    let nanos = time::OffsetDateTime::now_utc().unix_timestamp_nanos();
    i64::try_from(nanos / 1_000_000).unwrap_or(i64::MAX)
}
