//! API integration tests for streetview-server.
//!
//! These tests drive the full router with an in-memory cache store and a
//! scripted image source, covering correlation-id validation, error mapping
//! and the cache-aside flow through the REST endpoint.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, HeaderValue, Request, StatusCode},
    Router,
};
use serde_json::Value;
use streetview_core::logging::RequiredFields;
use streetview_core::{
    codes, messages, CachedImages, Fields, GetStreetViewImageHandler, ImageSource, LogBackend,
    LogError, LoggingChain, MemoryConnectionFactory, RetrievalError, Severity,
};
use streetview_server::{create_router, AppState, CORRELATION_ID_HEADER};
use tower::ServiceExt;
use uuid::Uuid;

const JPEG_BYTES: &[u8] = &[
    0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00, 0x01,
];

/// Always returns the same outcome and counts calls
struct FixedSource {
    outcome: Result<Vec<u8>, RetrievalError>,
    calls: AtomicUsize,
}

#[async_trait]
impl ImageSource for FixedSource {
    async fn fetch(&self, _latitude: f64, _longitude: f64) -> streetview_core::Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcome.clone()
    }
}

/// Sleeps for a full retry budget before failing, like an exhausted API client
struct SlowFailingSource {
    delay: Duration,
}

#[async_trait]
impl ImageSource for SlowFailingSource {
    async fn fetch(&self, _latitude: f64, _longitude: f64) -> streetview_core::Result<Vec<u8>> {
        tokio::time::sleep(self.delay).await;
        Err(RetrievalError::application(
            "Error making request to: 'https://internal.example/streetview?key=[REDACTED]'",
        ))
    }
}

#[derive(Debug, Clone)]
struct Entry {
    severity: Severity,
    message: String,
    correlation_id: Uuid,
}

/// Records every log call together with the correlation id in effect
struct CapturingBackend {
    entries: Mutex<Vec<Entry>>,
    required: RequiredFields,
}

impl CapturingBackend {
    fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            required: RequiredFields::new("test"),
        }
    }

    fn entries(&self) -> Vec<Entry> {
        self.entries.lock().unwrap().clone()
    }
}

#[async_trait]
impl LogBackend for CapturingBackend {
    fn name(&self) -> &'static str {
        "capturing"
    }

    async fn log(&self, severity: Severity, message: &str, _fields: &Fields) -> Result<(), LogError> {
        self.entries.lock().unwrap().push(Entry {
            severity,
            message: message.to_string(),
            correlation_id: self.required.correlation_id(),
        });
        Ok(())
    }

    fn update_correlation_id(&self, correlation_id: Uuid) {
        self.required.set_correlation_id(correlation_id);
    }
}

struct TestApp {
    router: Router,
    source: Arc<FixedSource>,
    logs: Arc<CapturingBackend>,
}

fn router_with_source(source: Arc<dyn ImageSource>) -> (Router, Arc<CapturingBackend>) {
    let logs = Arc::new(CapturingBackend::new());
    let logger = Arc::new(LoggingChain::new(vec![Arc::clone(&logs) as Arc<dyn LogBackend>]));

    let images = CachedImages::new(Arc::new(MemoryConnectionFactory::new()), Arc::clone(&logger));
    let handler = GetStreetViewImageHandler::new(Arc::new(images), source, Arc::clone(&logger));

    (create_router(AppState::new(handler, logger)), logs)
}

fn create_test_app(outcome: Result<Vec<u8>, RetrievalError>) -> TestApp {
    let source = Arc::new(FixedSource {
        outcome,
        calls: AtomicUsize::new(0),
    });
    let (router, logs) = router_with_source(Arc::clone(&source) as Arc<dyn ImageSource>);

    TestApp {
        router,
        source,
        logs,
    }
}

fn image_request(correlation_id: Option<&str>, query: &str) -> Request<Body> {
    let mut builder = Request::builder().uri(format!("/v1/street-view?{query}"));
    if let Some(id) = correlation_id {
        builder = builder.header(CORRELATION_ID_HEADER, id);
    }
    builder.body(Body::empty()).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

// ============================================================================
// Health & Docs
// ============================================================================

#[tokio::test]
async fn test_health_endpoint_returns_ok() {
    let app = create_test_app(Ok(JPEG_BYTES.to_vec()));

    let response = app
        .router
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["service"], "streetview-server");
}

#[tokio::test]
async fn test_openapi_document_lists_image_path() {
    let app = create_test_app(Ok(JPEG_BYTES.to_vec()));

    let response = app
        .router
        .oneshot(
            Request::builder()
                .uri("/api-docs/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert!(json["paths"]["/v1/street-view"].is_object());
}

// ============================================================================
// Correlation id validation
// ============================================================================

#[tokio::test]
async fn test_missing_correlation_id_is_invalid_argument() {
    let app = create_test_app(Ok(JPEG_BYTES.to_vec()));

    let response = app
        .router
        .oneshot(image_request(None, "latitude=51.5&longitude=-0.12"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["code"], "INVALID_ARGUMENT");
    assert_eq!(json["error"], messages::EMPTY_CORRELATION_ID);
    assert_eq!(app.source.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_malformed_correlation_id_is_invalid_argument() {
    let app = create_test_app(Ok(JPEG_BYTES.to_vec()));

    let response = app
        .router
        .oneshot(image_request(Some("definitely-not-a-uuid"), "latitude=1&longitude=2"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["error"], messages::INVALID_CORRELATION_ID);
}

#[tokio::test]
async fn test_unreadable_correlation_id_is_invalid_not_empty() {
    let app = create_test_app(Ok(JPEG_BYTES.to_vec()));

    let mut request = image_request(None, "latitude=1&longitude=2");
    request.headers_mut().insert(
        CORRELATION_ID_HEADER,
        HeaderValue::from_bytes(b"\xfa\xfb\xfc").unwrap(),
    );

    let response = app.router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["error"], messages::INVALID_CORRELATION_ID);
    assert_eq!(app.source.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_non_v4_correlation_id_is_rejected() {
    let app = create_test_app(Ok(JPEG_BYTES.to_vec()));

    let response = app
        .router
        .oneshot(image_request(
            Some("6ba7b810-9dad-11d1-80b4-00c04fd430c8"),
            "latitude=1&longitude=2",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.source.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_non_numeric_coordinates_are_bad_request() {
    let app = create_test_app(Ok(JPEG_BYTES.to_vec()));
    let id = Uuid::new_v4().to_string();

    let response = app
        .router
        .oneshot(image_request(Some(&id), "latitude=north&longitude=2"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["code"], "INVALID_ARGUMENT");
}

// ============================================================================
// Retrieval
// ============================================================================

#[tokio::test]
async fn test_image_is_returned_as_jpeg() {
    let app = create_test_app(Ok(JPEG_BYTES.to_vec()));
    let id = Uuid::new_v4();

    let response = app
        .router
        .oneshot(image_request(
            Some(&id.to_string()),
            "latitude=51.507351&longitude=-0.127758",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/jpeg");
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], JPEG_BYTES);

    let received: Vec<_> = app
        .logs
        .entries()
        .into_iter()
        .filter(|entry| entry.message == "Request received")
        .collect();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].severity, Severity::Info);
    assert_eq!(received[0].correlation_id, id);
}

#[tokio::test]
async fn test_second_request_is_served_from_cache() {
    let app = create_test_app(Ok(JPEG_BYTES.to_vec()));

    for _ in 0..3 {
        let id = Uuid::new_v4().to_string();
        let response = app
            .router
            .clone()
            .oneshot(image_request(Some(&id), "latitude=48.8584&longitude=2.2945"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    assert_eq!(app.source.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_invalid_location_is_not_found() {
    let app = create_test_app(Err(RetrievalError::user(
        codes::INVALID_LOCATION,
        messages::INVALID_LOCATION,
    )));
    let id = Uuid::new_v4().to_string();

    let response = app
        .router
        .oneshot(image_request(Some(&id), "latitude=0&longitude=0"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = json_body(response).await;
    assert_eq!(json["code"], "NOT_FOUND");
    assert_eq!(json["error"], messages::INVALID_LOCATION);
}

#[tokio::test]
async fn test_application_error_is_generic_and_logged_once() {
    let app = create_test_app(Err(RetrievalError::application(
        "Error making request to: 'https://internal.example/streetview?key=[REDACTED]'",
    )));
    let id = Uuid::new_v4();

    let response = app
        .router
        .oneshot(image_request(Some(&id.to_string()), "latitude=1&longitude=2"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = json_body(response).await;
    assert_eq!(json["code"], "UNKNOWN");
    assert_eq!(
        json["error"],
        "An unknown error occurred, please retry the request later."
    );
    assert!(!json.to_string().contains("internal.example"));

    let errors: Vec<_> = app
        .logs
        .entries()
        .into_iter()
        .filter(|entry| entry.severity == Severity::Error)
        .collect();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains("internal.example"));
    assert_eq!(errors[0].correlation_id, id);
}

#[tokio::test(start_paused = true)]
async fn test_slow_retry_exhaustion_still_maps_to_unknown() {
    // Longer than one full 5s x 10 retry phase
    let source = Arc::new(SlowFailingSource {
        delay: Duration::from_secs(95),
    });
    let (router, logs) = router_with_source(source);
    let id = Uuid::new_v4().to_string();

    let response = router
        .oneshot(image_request(Some(&id), "latitude=1&longitude=2"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = json_body(response).await;
    assert_eq!(json["code"], "UNKNOWN");

    let errors: Vec<_> = logs
        .entries()
        .into_iter()
        .filter(|entry| entry.severity == Severity::Error)
        .collect();
    assert_eq!(errors.len(), 1);
}
