pub mod cache;
pub mod factory;
pub mod rate_limiter;
pub mod redis_store;
pub mod store;

pub use cache::LocalCache;
pub use factory::{create_in_memory_store, create_store};
pub use rate_limiter::RateLimiter;
pub use redis_store::RedisStore;
pub use store::*;
