//! Router configuration module
//!
//! Configures all routes, middleware layers, and creates the application router.

use std::any::Any;
use std::sync::Arc;

use axum::{
    response::IntoResponse,
    routing::get,
    Router,
};
use streetview_core::TransportStatus;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::handlers::{health, street_view_handler};
use crate::openapi::openapi_json;
use crate::state::AppState;

/// Create the application router
///
/// No request deadline: a request runs until the handler finishes or its
/// retry budgets are exhausted, so every failure reaches the error mapper.
pub fn create_router(state: AppState) -> Router {
    // A panicking request is logged through the chain and answered as unknown
    let logger = Arc::clone(&state.logger);
    let catch_panic = CatchPanicLayer::custom(move |panic: Box<dyn Any + Send + 'static>| {
        let message = format!(
            "Recovered from panic while handling request: {}",
            panic_message(panic.as_ref())
        );
        let logger = Arc::clone(&logger);
        tokio::spawn(async move { logger.error(&message).await });

        ApiError::from(TransportStatus::unknown()).into_response()
    });

    Router::new()
        .route("/v1/street-view", get(street_view_handler))
        .route("/health", get(health))
        .route("/api-docs/openapi.json", get(openapi_json))
        .with_state(state)
        .layer(catch_panic)
        .layer(TraceLayer::new_for_http())
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message_extraction() {
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        let borrowed: Box<dyn Any + Send> = Box::new("borrowed");
        let other: Box<dyn Any + Send> = Box::new(42u8);

        assert_eq!(panic_message(owned.as_ref()), "owned");
        assert_eq!(panic_message(borrowed.as_ref()), "borrowed");
        assert_eq!(panic_message(other.as_ref()), "unknown panic payload");
    }
}
