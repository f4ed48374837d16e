use crate::error::{AppError, Result};
use crate::state::KeyValueStore;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::Client;

/// Redis-backed shared key/value store
#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
}

impl RedisStore {
    /// Connect and verify the server answers PING
    pub async fn new(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url).map_err(|e| {
            AppError::Configuration(format!("Invalid Redis URL '{}': {}", redis_url, e))
        })?;

        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| AppError::Cache(format!("Failed to connect to Redis: {}", e)))?;

        let mut test_conn = connection.clone();
        redis::cmd("PING")
            .query_async::<_, String>(&mut test_conn)
            .await
            .map_err(|e| AppError::Cache(format!("Redis connection test failed: {}", e)))?;

        tracing::info!("Connected to Redis store");

        Ok(Self { connection })
    }

    /// Extract `used_memory_human` from an `INFO memory` reply
    fn parse_used_memory(info: &str) -> Option<String> {
        info.lines()
            .find_map(|line| line.strip_prefix("used_memory_human:"))
            .map(|v| v.trim().to_string())
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    fn backend_name(&self) -> &str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.connection.clone();
        let value: Option<String> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        Ok(value)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()> {
        let mut conn = self.connection.clone();
        redis::cmd("SETEX")
            .arg(key)
            .arg(ttl_secs)
            .arg(value)
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn del(&self, keys: &[String]) -> Result<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.connection.clone();
        let removed: u64 = redis::cmd("DEL").arg(keys).query_async(&mut conn).await?;
        Ok(removed)
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        let mut conn = self.connection.clone();
        let keys: Vec<String> = redis::cmd("KEYS").arg(pattern).query_async(&mut conn).await?;
        Ok(keys)
    }

    async fn incr(&self, key: &str) -> Result<i64> {
        let mut conn = self.connection.clone();
        let count: i64 = redis::cmd("INCR").arg(key).query_async(&mut conn).await?;
        Ok(count)
    }

    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<bool> {
        let mut conn = self.connection.clone();
        let set: i64 = redis::cmd("EXPIRE")
            .arg(key)
            .arg(ttl_secs)
            .query_async(&mut conn)
            .await?;
        Ok(set == 1)
    }

    async fn ttl(&self, key: &str) -> Result<i64> {
        let mut conn = self.connection.clone();
        let ttl: i64 = redis::cmd("TTL").arg(key).query_async(&mut conn).await?;
        Ok(ttl)
    }

    async fn memory_usage(&self) -> Result<String> {
        let mut conn = self.connection.clone();
        let info: String = redis::cmd("INFO").arg("memory").query_async(&mut conn).await?;
        Ok(Self::parse_used_memory(&info).unwrap_or_else(|| "unknown".to_string()))
    }
}
