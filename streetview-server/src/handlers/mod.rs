//! HTTP request handlers

pub mod health;
pub mod image;

pub use crate::state::AppState;
pub use health::{health, HealthResponse};
pub use image::{street_view_handler, StreetViewQuery, CORRELATION_ID_HEADER};
