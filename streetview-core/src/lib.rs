//! Streetview Core - resilient Street View image retrieval
//!
//! This crate answers "give me the street-level photo for this coordinate"
//! while keeping paid imagery API calls to a minimum and surviving outages of
//! both the imagery API and the observability backend.
//!
//! # Features
//!
//! - Cache-aside repository keyed purely by coordinates (Redis or in-memory)
//! - Metadata probe before every billable image request
//! - Fixed-delay retry that reports every attempt's failure on exhaustion
//! - Magic-byte validation: only `image/jpeg` payloads become an [`Image`]
//! - Logging chain falling back from Elasticsearch to a local file
//! - Two-kind error taxonomy mapped to a stable outward status
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use streetview_core::{
//!     CachedImages, ErrorMapper, FileSink, GetStreetViewImageHandler, LogBackend, LoggingChain,
//!     MemoryConnectionFactory, ReqwestTransport, StreetViewApiConfig, StreetViewClient,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let file = FileSink::open("/tmp/streetview_backup.log", "dev")?;
//! let logger = Arc::new(LoggingChain::new(vec![Arc::new(file) as Arc<dyn LogBackend>]));
//!
//! let images = CachedImages::new(Arc::new(MemoryConnectionFactory::new()), Arc::clone(&logger));
//! let client = StreetViewClient::new(
//!     StreetViewApiConfig::default(),
//!     Arc::new(ReqwestTransport::new()?),
//!     Arc::clone(&logger),
//! );
//! let handler = GetStreetViewImageHandler::new(Arc::new(images), Arc::new(client), Arc::clone(&logger));
//!
//! let result = handler.handle(51.507351, -0.127758).await;
//! let status = ErrorMapper::new(logger)
//!     .map_to_transport_error(result.as_ref().err())
//!     .await;
//! println!("{}: {}", status.code, status.message);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod cache;
pub mod error;
pub mod handler;
pub mod image;
pub mod logging;
pub mod mapper;
pub mod retry;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export main types for convenience
pub use api::{
    redact, HttpResponse, HttpTransport, ImageSource, ReqwestTransport, StreetViewApiConfig,
    StreetViewClient, TransportError,
};
pub use cache::{
    CachedImages, ConnectionFactory, MemoryConnectionFactory, RedisConfig, RedisConnectionFactory,
    StoreConnection, StoreError, StreetViewImages, CACHE_TTL,
};
pub use error::{codes, messages, Result, RetrievalError};
pub use handler::GetStreetViewImageHandler;
pub use self::image::{Image, ImageIdentity, ValidationError};
pub use logging::{
    with_correlation_id, ElasticsearchConfig, ElasticsearchSink, Fields, FileSink, LogBackend,
    LogError, LoggingChain, Severity,
};
pub use mapper::{ErrorMapper, TransportCode, TransportStatus};
pub use retry::{RetryExhausted, RetryPolicy};
