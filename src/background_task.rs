use tokio::time::{interval, Duration};

use crate::limiter::InMemoryRateLimitStore;

/// Drops in-memory rate limit windows that have expired, so the map only holds
/// clients seen within the current window.
pub async fn start_eviction_task(store: InMemoryRateLimitStore, every: Duration) {
    let mut interval = interval(every);

    loop {
        interval.tick().await;

        let evicted = store.evict_expired();
        if evicted > 0 {
            tracing::debug!("Evicted {} expired rate limit windows", evicted);
        }
    }
}
