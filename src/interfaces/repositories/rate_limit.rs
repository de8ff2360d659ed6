use std::{sync::Arc, time::Duration};

use async_trait::async_trait;

use crate::errors::RateLimitError;

/// Outcome of recording one attempt against a fixed window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    /// Attempts seen in the current window, including this one.
    pub attempts: u32,
    pub limit: u32,
    /// Time left until the current window closes.
    pub reset_in: Duration,
}

impl RateLimitDecision {
    pub fn remaining(&self) -> u32 {
        self.limit.saturating_sub(self.attempts)
    }

    /// Whole seconds a rejected client should wait, never zero.
    pub fn retry_after_secs(&self) -> u64 {
        let secs = self.reset_in.as_secs();
        if self.reset_in.subsec_nanos() > 0 { secs + 1 } else { secs.max(1) }
    }
}

#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Atomically increments the counter for `key` and checks it against the limit.
    async fn hit(&self, key: &str) -> Result<RateLimitDecision, RateLimitError>;

    /// Drops the counter for `key`, starting a fresh window on the next hit.
    async fn reset(&self, key: &str) -> Result<(), RateLimitError>;

    /// Short name of the backing store, reported by the health endpoint.
    fn backend(&self) -> &'static str;

    async fn is_healthy(&self) -> bool {
        true
    }
}

#[async_trait]
impl<T> RateLimitStore for Arc<T>
where
    T: RateLimitStore + ?Sized,
{
    async fn hit(&self, key: &str) -> Result<RateLimitDecision, RateLimitError> {
        (**self).hit(key).await
    }

    async fn reset(&self, key: &str) -> Result<(), RateLimitError> {
        (**self).reset(key).await
    }

    fn backend(&self) -> &'static str {
        (**self).backend()
    }

    async fn is_healthy(&self) -> bool {
        (**self).is_healthy().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_after_rounds_up() {
        let decision = RateLimitDecision {
            allowed: false,
            attempts: 6,
            limit: 5,
            reset_in: Duration::from_millis(12_300),
        };
        assert_eq!(decision.retry_after_secs(), 13);
        assert_eq!(decision.remaining(), 0);
    }

    #[test]
    fn retry_after_is_never_zero() {
        let decision = RateLimitDecision {
            allowed: false,
            attempts: 6,
            limit: 5,
            reset_in: Duration::ZERO,
        };
        assert_eq!(decision.retry_after_secs(), 1);
    }
}
