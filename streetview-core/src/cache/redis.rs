use std::sync::Arc;
use std::time::Duration;

use ::redis::aio::MultiplexedConnection;
use ::redis::{Client, RedisError};
use async_trait::async_trait;
use tracing::{debug, instrument};

use super::{ConnectionFactory, StoreConnection, StoreError};
use crate::retry::RetryPolicy;

#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    /// Applied to connection creation only, never to individual commands.
    pub retry: RetryPolicy,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 6379,
            retry: RetryPolicy::from_secs(1, 3),
        }
    }
}

impl RedisConfig {
    pub fn url(&self) -> String {
        format!("redis://{}:{}/", self.host, self.port)
    }
}

pub struct RedisConnectionFactory {
    config: RedisConfig,
}

impl RedisConnectionFactory {
    pub fn new(config: RedisConfig) -> Self {
        Self { config }
    }

    async fn connect_once(&self) -> Result<MultiplexedConnection, StoreError> {
        let client = Client::open(self.config.url()).map_err(connection_error)?;
        let mut connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(connection_error)?;

        let _: String = ::redis::cmd("PING")
            .query_async(&mut connection)
            .await
            .map_err(connection_error)?;
        Ok(connection)
    }
}

#[async_trait]
impl ConnectionFactory for RedisConnectionFactory {
    #[instrument(skip(self), fields(host = %self.config.host, port = self.config.port))]
    async fn create(&self) -> Result<Arc<dyn StoreConnection>, StoreError> {
        let connection = self
            .config
            .retry
            .execute(|| self.connect_once())
            .await
            .map_err(|exhausted| StoreError::Connection(exhausted.to_string()))?;

        debug!("Connected to Redis");
        Ok(Arc::new(RedisConnection { connection }))
    }
}

/// Multiplexed handles are cheap to clone; each command works on a clone.
struct RedisConnection {
    connection: MultiplexedConnection,
}

#[async_trait]
impl StoreConnection for RedisConnection {
    async fn ping(&self) -> Result<(), StoreError> {
        let mut connection = self.connection.clone();
        let _: String = ::redis::cmd("PING")
            .query_async(&mut connection)
            .await
            .map_err(connection_error)?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let mut connection = self.connection.clone();
        let value: Option<Vec<u8>> = ::redis::cmd("GET")
            .arg(key)
            .query_async(&mut connection)
            .await
            .map_err(command_error)?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), StoreError> {
        let mut connection = self.connection.clone();
        let _: () = ::redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(ttl.as_secs())
            .query_async(&mut connection)
            .await
            .map_err(command_error)?;
        Ok(())
    }
}

fn connection_error(err: RedisError) -> StoreError {
    StoreError::Connection(err.to_string())
}

fn command_error(err: RedisError) -> StoreError {
    StoreError::Command(err.to_string())
}
