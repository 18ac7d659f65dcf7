//! Streetview Server Library - HTTP boundary for Street View image retrieval
//!
//! This library exposes the server components for use in integration tests.
//! The main binary uses these same components.

pub mod config;
pub mod error;
pub mod handlers;
pub mod openapi;
pub mod routes;
pub mod state;
pub mod validation;

pub use config::{CacheStore, Config, ConfigError};
pub use error::ApiError;
pub use handlers::CORRELATION_ID_HEADER;
pub use openapi::ApiDoc;
pub use routes::create_router;
pub use state::AppState;
pub use validation::validate_correlation_id;
