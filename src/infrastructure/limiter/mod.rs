pub mod clock;
pub mod rate_limiter;
pub mod redis_store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use rate_limiter::InMemoryRateLimitStore;
pub use redis_store::RedisRateLimitStore;
