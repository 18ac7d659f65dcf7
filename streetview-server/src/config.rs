//! Server configuration module
//!
//! Handles loading configuration from environment variables with sensible defaults.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use streetview_core::{ElasticsearchConfig, RedisConfig, RetryPolicy, StreetViewApiConfig};
use thiserror::Error;
use zeroize::Zeroizing;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingVar(&'static str),
}

/// Which key/value store backs the image cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStore {
    Redis,
    /// In-process map, for local runs without Redis.
    Memory,
}

impl FromStr for CacheStore {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "redis" => Ok(Self::Redis),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown cache store: {other}")),
        }
    }
}

/// Server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host (default: 127.0.0.1)
    pub host: IpAddr,
    /// Server port (default: 4000)
    pub port: u16,
    /// Retry applied to binding the listener (default: 5s x 10)
    pub retry: RetryPolicy,
    /// Deployment environment injected into every log record (default: dev)
    pub env: String,
    /// Local fallback log file
    pub backup_log_file: PathBuf,
    pub cache_store: CacheStore,
    pub redis: RedisConfig,
    pub streetview: StreetViewApiConfig,
    pub elasticsearch: ElasticsearchConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 4000,
            retry: RetryPolicy::from_secs(5, 10),
            env: "dev".to_string(),
            backup_log_file: default_backup_log_file(),
            cache_store: CacheStore::Redis,
            redis: RedisConfig::default(),
            streetview: StreetViewApiConfig::default(),
            elasticsearch: ElasticsearchConfig::default(),
        }
    }
}

fn default_backup_log_file() -> PathBuf {
    std::env::temp_dir().join("streetview_backup.log")
}

/// Parse an optional variable, falling back to `default` when unset or invalid.
fn env_or<T: FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn retry_from_env(prefix: &str, default: RetryPolicy) -> RetryPolicy {
    RetryPolicy::from_secs(
        env_or(&format!("{prefix}_RETRY_DELAY"), default.delay().as_secs()),
        env_or(&format!("{prefix}_MAX_RETRIES"), default.max_attempts()),
    )
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let api_key = std::env::var("STREETVIEW_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::MissingVar("STREETVIEW_API_KEY"))?;

        let streetview = StreetViewApiConfig {
            endpoint: env_or("STREETVIEW_API_ENDPOINT", defaults.streetview.endpoint.clone()),
            width: env_or("STREETVIEW_API_IMAGE_WIDTH", defaults.streetview.width),
            height: env_or("STREETVIEW_API_IMAGE_HEIGHT", defaults.streetview.height),
            fov: env_or("STREETVIEW_API_IMAGE_FOV", defaults.streetview.fov),
            api_key: Zeroizing::new(api_key),
            retry: retry_from_env("STREETVIEW_API", defaults.streetview.retry),
        };

        let redis = RedisConfig {
            host: env_or("REDIS_HOST", defaults.redis.host.clone()),
            port: env_or("REDIS_PORT", defaults.redis.port),
            retry: retry_from_env("REDIS", defaults.redis.retry),
        };

        let elasticsearch = ElasticsearchConfig {
            host: env_or("ELASTICSEARCH_HOST", defaults.elasticsearch.host.clone()),
            port: env_or("ELASTICSEARCH_PORT", defaults.elasticsearch.port),
            index: env_or("ELASTICSEARCH_INDEX", defaults.elasticsearch.index.clone()),
            retry: retry_from_env("ELASTICSEARCH", defaults.elasticsearch.retry),
        };

        Ok(Self {
            host: env_or("SERVER_HOST", defaults.host),
            port: env_or("SERVER_PORT", defaults.port),
            retry: retry_from_env("SERVER", defaults.retry),
            env: env_or("APP_ENV", defaults.env),
            backup_log_file: env_or("BACKUP_LOG_FILE", defaults.backup_log_file),
            cache_store: env_or("CACHE_STORE", defaults.cache_store),
            redis,
            streetview,
            elasticsearch,
        })
    }

    /// Get socket address from config
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
