//! Application state module
//!
//! Defines shared state accessible across all request handlers.

use std::sync::Arc;

use streetview_core::{ErrorMapper, GetStreetViewImageHandler, LoggingChain};

/// Application state containing shared resources.
#[derive(Clone)]
pub struct AppState {
    /// Cache-aside image retrieval
    pub handler: Arc<GetStreetViewImageHandler>,
    /// Converts pipeline errors to the outward status
    pub mapper: Arc<ErrorMapper>,
    /// Application log chain (Elasticsearch, then backup file)
    pub logger: Arc<LoggingChain>,
}

impl AppState {
    pub fn new(handler: GetStreetViewImageHandler, logger: Arc<LoggingChain>) -> Self {
        Self {
            handler: Arc::new(handler),
            mapper: Arc::new(ErrorMapper::new(Arc::clone(&logger))),
            logger,
        }
    }
}
