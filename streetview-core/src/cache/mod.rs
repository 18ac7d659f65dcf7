//! Cache-aside repository for Street View images.
//!
//! The store is a plain key/value service: key is the image identity, value
//! is the raw JPEG bytes, every entry expires after [`CACHE_TTL`]. The cache
//! is an optimization, so nothing here ever fails a request: an unreachable
//! store or corrupt entry degrades to a miss and a failed write to `false`.

mod memory;
mod redis;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::instrument;

use crate::image::{Image, ImageIdentity};
use crate::logging::{fields, LoggingChain, Severity};

pub use self::memory::MemoryConnectionFactory;
pub use self::redis::{RedisConfig, RedisConnectionFactory};

/// How long a cached image stays valid (1337 hours).
pub const CACHE_TTL: Duration = Duration::from_secs(1337 * 60 * 60);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("cache store connection failed: {0}")]
    Connection(String),

    #[error("cache store command failed: {0}")]
    Command(String),
}

/// One live handle to the key/value store.
#[async_trait]
pub trait StoreConnection: Send + Sync {
    async fn ping(&self) -> Result<(), StoreError>;

    /// `Ok(None)` when the key does not exist.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), StoreError>;
}

/// Opens new store connections. Implementations apply their own retry policy.
#[async_trait]
pub trait ConnectionFactory: Send + Sync {
    async fn create(&self) -> Result<Arc<dyn StoreConnection>, StoreError>;
}

/// Repository of Street View images keyed by coordinates.
#[async_trait]
pub trait StreetViewImages: Send + Sync {
    /// Cached image for the coordinates, or `None` on any kind of miss.
    async fn find(&self, latitude: f64, longitude: f64) -> Option<Image>;

    /// Store the image under its identity. `false` if the store refused.
    async fn save(&self, image: &Image) -> bool;
}

/// [`StreetViewImages`] over any [`ConnectionFactory`].
///
/// Holds a single lazily created connection. Before each operation an
/// existing handle is pinged; a missing handle or a failed ping is the only
/// trigger for creating a new one.
pub struct CachedImages {
    factory: Arc<dyn ConnectionFactory>,
    connection: Mutex<Option<Arc<dyn StoreConnection>>>,
    logger: Arc<LoggingChain>,
}

impl CachedImages {
    pub fn new(factory: Arc<dyn ConnectionFactory>, logger: Arc<LoggingChain>) -> Self {
        Self {
            factory,
            connection: Mutex::new(None),
            logger,
        }
    }

    async fn connection(&self) -> Option<Arc<dyn StoreConnection>> {
        let current = self.connection.lock().await.clone();

        if let Some(connection) = &current {
            match connection.ping().await {
                Ok(()) => return current,
                Err(err) => {
                    self.logger
                        .warning(&format!("Cache store ping failed, reconnecting: {err}"))
                        .await;
                }
            }
        }

        let mut guard = self.connection.lock().await;

        // Someone else replaced the handle while we were pinging: use theirs
        let unchanged = match (guard.as_ref(), current.as_ref()) {
            (Some(installed), Some(seen)) => Arc::ptr_eq(installed, seen),
            (None, None) => true,
            _ => false,
        };
        if !unchanged {
            return guard.clone();
        }

        match self.factory.create().await {
            Ok(connection) => {
                *guard = Some(Arc::clone(&connection));
                Some(connection)
            }
            Err(err) => {
                *guard = None;
                self.logger
                    .warning(&format!("Unable to connect to cache store: {err}"))
                    .await;
                None
            }
        }
    }
}

#[async_trait]
impl StreetViewImages for CachedImages {
    #[instrument(skip(self), level = "debug")]
    async fn find(&self, latitude: f64, longitude: f64) -> Option<Image> {
        let identity = ImageIdentity::new(latitude, longitude);
        let connection = self.connection().await?;

        let bytes = match connection.get(identity.as_str()).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(err) => {
                self.logger
                    .record(
                        Severity::Warning,
                        &format!("Unable to read key from cache: {err}"),
                        fields([("key", json!(identity.as_str()))]),
                    )
                    .await;
                return None;
            }
        };

        match Image::new(latitude, longitude, bytes) {
            Ok(image) => Some(image),
            Err(err) => {
                self.logger
                    .record(
                        Severity::Warning,
                        &format!("Image bytes retrieved from cache invalid, reason: '{err}'"),
                        fields([("key", json!(identity.as_str()))]),
                    )
                    .await;
                None
            }
        }
    }

    #[instrument(skip(self, image), fields(key = %image.identity()), level = "debug")]
    async fn save(&self, image: &Image) -> bool {
        let Some(connection) = self.connection().await else {
            return false;
        };

        let key = image.identity().as_str();
        if let Err(err) = connection.set(key, image.bytes(), CACHE_TTL).await {
            self.logger
                .record(
                    Severity::Warning,
                    &format!("Unable to store image in cache: {err}"),
                    fields([("key", json!(key))]),
                )
                .await;
            return false;
        }

        self.logger
            .record(
                Severity::Debug,
                "Stored image in cache",
                fields([("key", json!(key)), ("byte_length", json!(image.bytes().len()))]),
            )
            .await;
        true
    }
}
