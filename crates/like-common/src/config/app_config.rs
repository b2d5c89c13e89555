//! Application configuration structs
//!
//! Loads configuration from environment variables (and a `.env` file when present).

use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app: AppSettings,
    pub gateway: GatewayConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub jwt: JwtConfig,
    pub likes: LikeConfig,
}

/// General application settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default = "default_env")]
    pub env: Environment,
    /// Identifies this process on the shared update channel
    pub instance_id: String,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "production" => Some(Self::Production),
            "staging" => Some(Self::Staging),
            "development" => Some(Self::Development),
            _ => None,
        }
    }
}

/// WebSocket gateway server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
    /// Close connections silent for this long. 0 disables the monitor.
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
    #[serde(default = "default_max_message_bytes")]
    pub max_message_bytes: usize,
}

impl GatewayConfig {
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Idle timeout, `None` when disabled
    #[must_use]
    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_secs > 0).then(|| Duration::from_secs(self.idle_timeout_secs))
    }
}

/// Database configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Redis configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
    #[serde(default = "default_redis_max_connections")]
    pub max_connections: u32,
    /// Bound on waiting for, opening and recycling a pooled connection
    #[serde(default = "default_redis_timeout_ms")]
    pub timeout_ms: u64,
}

impl RedisConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.max(1))
    }
}

/// JWT configuration
#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry: i64,
}

/// Like pipeline tuning
#[derive(Debug, Clone, Deserialize)]
pub struct LikeConfig {
    /// Pending mutations that trigger an early drain
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_sync_interval")]
    pub sync_interval_secs: u64,
    /// Batches the drain channel can hold before the cache stops handing off
    #[serde(default = "default_drain_buffer")]
    pub drain_buffer: usize,
    /// Toggles queued for the shared counter
    #[serde(default = "default_relay_buffer")]
    pub relay_buffer: usize,
}

impl LikeConfig {
    #[must_use]
    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs.max(1))
    }
}

impl Default for LikeConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            sync_interval_secs: default_sync_interval(),
            drain_buffer: default_drain_buffer(),
            relay_buffer: default_relay_buffer(),
        }
    }
}

// Default value functions
fn default_app_name() -> String {
    "like-gateway".to_string()
}

fn default_env() -> Environment {
    Environment::Development
}

fn default_instance_id() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("node-{}", &id[..8])
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_idle_timeout() -> u64 {
    120
}

fn default_max_message_bytes() -> usize {
    64 * 1024
}

fn default_max_connections() -> u32 {
    20
}

fn default_min_connections() -> u32 {
    5
}

fn default_redis_max_connections() -> u32 {
    10
}

fn default_redis_timeout_ms() -> u64 {
    2000
}

fn default_access_token_expiry() -> i64 {
    900 // 15 minutes
}

fn default_batch_size() -> usize {
    100
}

fn default_sync_interval() -> u64 {
    10
}

fn default_drain_buffer() -> usize {
    16
}

fn default_relay_buffer() -> usize {
    1024
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if required environment variables are missing or malformed
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source
    ///
    /// # Errors
    /// Returns an error if required variables are missing or malformed
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| lookup(key).ok_or(ConfigError::MissingVar(key));

        Ok(Self {
            app: AppSettings {
                name: lookup("APP_NAME").unwrap_or_else(default_app_name),
                env: lookup("APP_ENV")
                    .and_then(|s| Environment::parse(&s))
                    .unwrap_or_default(),
                instance_id: lookup("INSTANCE_ID")
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or_else(default_instance_id),
            },
            gateway: GatewayConfig {
                host: lookup("GATEWAY_HOST").unwrap_or_else(default_host),
                port: parse_value("GATEWAY_PORT", &required("GATEWAY_PORT")?)?,
                idle_timeout_secs: parse_or(
                    &lookup,
                    "GATEWAY_IDLE_TIMEOUT_SECS",
                    default_idle_timeout,
                )?,
                max_message_bytes: parse_or(
                    &lookup,
                    "GATEWAY_MAX_MESSAGE_BYTES",
                    default_max_message_bytes,
                )?,
            },
            database: DatabaseConfig {
                url: required("DATABASE_URL")?,
                max_connections: parse_or(
                    &lookup,
                    "DATABASE_MAX_CONNECTIONS",
                    default_max_connections,
                )?,
                min_connections: parse_or(
                    &lookup,
                    "DATABASE_MIN_CONNECTIONS",
                    default_min_connections,
                )?,
            },
            redis: RedisConfig {
                url: required("REDIS_URL")?,
                max_connections: parse_or(
                    &lookup,
                    "REDIS_MAX_CONNECTIONS",
                    default_redis_max_connections,
                )?,
                timeout_ms: parse_or(&lookup, "REDIS_TIMEOUT_MS", default_redis_timeout_ms)?,
            },
            jwt: JwtConfig {
                secret: required("JWT_SECRET")?,
                access_token_expiry: parse_or(
                    &lookup,
                    "JWT_ACCESS_TOKEN_EXPIRY",
                    default_access_token_expiry,
                )?,
            },
            likes: LikeConfig {
                batch_size: parse_or(&lookup, "LIKE_BATCH_SIZE", default_batch_size)?,
                sync_interval_secs: parse_or(
                    &lookup,
                    "LIKE_SYNC_INTERVAL_SECS",
                    default_sync_interval,
                )?,
                drain_buffer: parse_or(&lookup, "LIKE_DRAIN_BUFFER", default_drain_buffer)?,
                relay_buffer: parse_or(&lookup, "LIKE_RELAY_BUFFER", default_relay_buffer)?,
            },
        })
    }
}

fn parse_value<T: FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue(key, raw.to_string()))
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: fn() -> T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default()),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
