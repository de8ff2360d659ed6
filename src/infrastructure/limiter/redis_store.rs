use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{Config as RedisPoolConfig, Pool, Runtime};
use redis::{AsyncCommands, RedisResult, Script};

use crate::{
    errors::RateLimitError,
    repositories::rate_limit::{RateLimitDecision, RateLimitStore},
};

/// INCR and arm the expiry in one round trip. A key that somehow lost its TTL
/// gets it re-armed so it cannot block a client forever.
const FIXED_WINDOW_SCRIPT: &str = r#"
local current = redis.call('INCR', KEYS[1])
if current == 1 then
    redis.call('PEXPIRE', KEYS[1], ARGV[1])
end
local ttl = redis.call('PTTL', KEYS[1])
if ttl < 0 then
    redis.call('PEXPIRE', KEYS[1], ARGV[1])
    ttl = tonumber(ARGV[1])
end
return {current, ttl}
"#;

/// Fixed-window counters shared by every instance behind the same Redis.
#[derive(Clone)]
pub struct RedisRateLimitStore {
    pool: Pool,
    script: Script,
    key_prefix: String,
    window_size: Duration,
    limit: u32,
}

impl RedisRateLimitStore {
    pub fn new(
        redis_url: &str,
        key_prefix: impl Into<String>,
        limit: u32,
        window_size: Duration,
    ) -> Result<Self, RateLimitError> {
        let pool = RedisPoolConfig::from_url(redis_url)
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| RateLimitError::RedisConnection(e.to_string()))?;

        Ok(Self {
            pool,
            script: Script::new(FIXED_WINDOW_SCRIPT),
            key_prefix: key_prefix.into(),
            window_size,
            limit,
        })
    }

    /// Client keys are URL-encoded so addresses like `::1` stay a single key segment.
    fn redis_key(&self, key: &str) -> String {
        format!("{}:{}", self.key_prefix, urlencoding::encode(key))
    }

    async fn connection(&self) -> Result<deadpool_redis::Connection, RateLimitError> {
        self.pool
            .get()
            .await
            .map_err(|e| RateLimitError::RedisConnection(e.to_string()))
    }
}

#[async_trait]
impl RateLimitStore for RedisRateLimitStore {
    async fn hit(&self, key: &str) -> Result<RateLimitDecision, RateLimitError> {
        let mut conn = self.connection().await?;
        let window_ms = self.window_size.as_millis() as u64;

        let (count, ttl_ms): (i64, i64) = self
            .script
            .key(self.redis_key(key))
            .arg(window_ms)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| RateLimitError::RedisOperation(e.to_string()))?;

        let attempts = u32::try_from(count.max(0)).unwrap_or(u32::MAX);
        Ok(RateLimitDecision {
            allowed: attempts <= self.limit,
            attempts,
            limit: self.limit,
            reset_in: Duration::from_millis(ttl_ms.max(0) as u64),
        })
    }

    async fn reset(&self, key: &str) -> Result<(), RateLimitError> {
        let mut conn = self.connection().await?;
        let _: () = conn
            .del(self.redis_key(key))
            .await
            .map_err(|e| RateLimitError::RedisOperation(e.to_string()))?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "redis"
    }

    async fn is_healthy(&self) -> bool {
        let Ok(mut conn) = self.connection().await else {
            return false;
        };
        let pong: RedisResult<String> = redis::cmd("PING").query_async(&mut conn).await;
        matches!(pong, Ok(ref p) if p == "PONG")
    }
}
