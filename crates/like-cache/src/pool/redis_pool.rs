//! deadpool-backed Redis pool shared by the counter and the blacklist.
//!
//! Connections are opened lazily, so building the pool succeeds while Redis
//! is down; the first command reports the outage instead. Waiting for,
//! opening and recycling a connection are all bounded by `timeout`, so an
//! unreachable server fails fast instead of hanging on the TCP connect.

use std::time::Duration;

use deadpool_redis::{Config, Connection, Pool, Runtime};
use like_common::RedisConfig;
use like_core::DomainError;
use redis::AsyncCommands;

/// Redis pool configuration
#[derive(Debug, Clone)]
pub struct RedisPoolConfig {
    /// Redis connection URL (e.g., `redis://localhost:6379`)
    pub url: String,
    pub max_connections: usize,
    pub timeout: Duration,
}

impl Default for RedisPoolConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            max_connections: 16,
            timeout: Duration::from_secs(2),
        }
    }
}

impl From<&RedisConfig> for RedisPoolConfig {
    fn from(config: &RedisConfig) -> Self {
        Self {
            url: config.url.clone(),
            max_connections: config.max_connections as usize,
            timeout: config.timeout(),
        }
    }
}

/// Failures of the Redis layer
#[derive(Debug, thiserror::Error)]
pub enum RedisPoolError {
    #[error("Failed to create Redis pool: {0}")]
    CreatePool(String),

    #[error("Redis unavailable: {0}")]
    Unavailable(#[from] deadpool_redis::PoolError),

    #[error("Redis command failed: {0}")]
    Command(#[from] redis::RedisError),

    #[error("Malformed pub/sub payload: {0}")]
    Payload(#[from] serde_json::Error),
}

impl From<RedisPoolError> for DomainError {
    fn from(err: RedisPoolError) -> Self {
        DomainError::CacheError(err.to_string())
    }
}

pub type RedisResult<T> = Result<T, RedisPoolError>;

/// Managed Redis connection pool
#[derive(Clone)]
pub struct RedisPool {
    pool: Pool,
}

impl std::fmt::Debug for RedisPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = self.pool.status();
        f.debug_struct("RedisPool")
            .field("size", &status.size)
            .field("available", &status.available)
            .finish()
    }
}

/// Strip credentials from a Redis URL before logging it
pub(crate) fn redact_url(url: &str) -> &str {
    url.split('@').next_back().unwrap_or(url)
}

impl RedisPool {
    pub fn new(config: RedisPoolConfig) -> RedisResult<Self> {
        let pool = Config::from_url(&config.url)
            .builder()
            .map_err(|e| RedisPoolError::CreatePool(e.to_string()))?
            .max_size(config.max_connections)
            .wait_timeout(Some(config.timeout))
            .create_timeout(Some(config.timeout))
            .recycle_timeout(Some(config.timeout))
            .runtime(Runtime::Tokio1)
            .build()
            .map_err(|e| RedisPoolError::CreatePool(e.to_string()))?;

        tracing::info!(
            url = %redact_url(&config.url),
            max_connections = config.max_connections,
            timeout_ms = config.timeout.as_millis(),
            "Redis pool created"
        );

        Ok(Self { pool })
    }

    pub async fn get(&self) -> RedisResult<Connection> {
        Ok(self.pool.get().await?)
    }

    /// PING through a pooled connection
    pub async fn health_check(&self) -> RedisResult<()> {
        let mut conn = self.get().await?;
        redis::cmd("PING").query_async::<String>(&mut conn).await?;
        Ok(())
    }

    pub async fn exists(&self, key: &str) -> RedisResult<bool> {
        let mut conn = self.get().await?;
        Ok(conn.exists(key).await?)
    }
}
