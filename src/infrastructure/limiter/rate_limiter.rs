use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;

use crate::{
    errors::RateLimitError,
    limiter::clock::{Clock, SystemClock},
    repositories::rate_limit::{RateLimitDecision, RateLimitStore},
};

/// Counter for one key: attempts seen since `window_start`.
#[derive(Debug)]
struct FixedWindow {
    window_start: Instant,
    count: u32,
}

impl FixedWindow {
    fn new(now: Instant) -> Self {
        Self { window_start: now, count: 0 }
    }

    fn is_expired(&self, now: Instant, window_size: Duration) -> bool {
        now.duration_since(self.window_start) >= window_size
    }

    /// Rolls over an expired window, then counts this attempt.
    fn hit(&mut self, now: Instant, window_size: Duration, limit: u32) -> RateLimitDecision {
        if self.is_expired(now, window_size) {
            self.window_start = now;
            self.count = 0;
        }

        self.count = self.count.saturating_add(1);

        let elapsed = now.duration_since(self.window_start);
        RateLimitDecision {
            allowed: self.count <= limit,
            attempts: self.count,
            limit,
            reset_in: window_size.saturating_sub(elapsed),
        }
    }
}

// --- Counter store & eviction ---
type Key = String;

/// Process-local fixed-window store. Each key has its own lock, so the
/// increment and the limit check happen as one step per client.
#[derive(Clone)]
pub struct InMemoryRateLimitStore {
    map: Arc<DashMap<Key, Arc<Mutex<FixedWindow>>>>,
    clock: Arc<dyn Clock>,
    window_size: Duration,
    limit: u32,
}

impl InMemoryRateLimitStore {
    pub fn new(limit: u32, window_size: Duration) -> Self {
        Self::with_clock(limit, window_size, Arc::new(SystemClock))
    }

    pub fn with_clock(limit: u32, window_size: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            map: Arc::new(DashMap::new()),
            clock,
            window_size,
            limit,
        }
    }

    fn get_window(&self, key: &str) -> Arc<Mutex<FixedWindow>> {
        if let Some(existing) = self.map.get(key) {
            return existing.clone();
        }

        let now = self.clock.now();
        self.map
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(FixedWindow::new(now))))
            .clone()
    }

    /// Drops every counter whose window has closed. Returns how many were removed.
    /// A window some `hit` still holds is kept, so that hit cannot land on a
    /// counter that is no longer in the map.
    pub fn evict_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.map.len();
        self.map.retain(|_, window| {
            Arc::strong_count(window) > 1 || !window.lock().is_expired(now, self.window_size)
        });
        before.saturating_sub(self.map.len())
    }
}

#[async_trait]
impl RateLimitStore for InMemoryRateLimitStore {
    async fn hit(&self, key: &str) -> Result<RateLimitDecision, RateLimitError> {
        let window = self.get_window(key);
        let mut w = window.lock();
        Ok(w.hit(self.clock.now(), self.window_size, self.limit))
    }

    async fn reset(&self, key: &str) -> Result<(), RateLimitError> {
        self.map.remove(key);
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
