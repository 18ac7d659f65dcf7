//! Client for the Street View Static API.
//!
//! Every fetch is two calls: a free metadata probe that tells whether imagery
//! exists at the coordinates, then the billable image request. Both go through
//! the same fixed retry policy, and each attempt has its own timeout.
//!
//! The API key only ever leaves this module inside the request URL. Anything
//! logged or returned has `key=...` redacted first.

mod transport;

use std::fmt;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tracing::instrument;
use url::Url;
use zeroize::Zeroizing;

use crate::error::{codes, messages, Result, RetrievalError};
use crate::logging::LoggingChain;
use crate::retry::{RetryExhausted, RetryPolicy};

pub use transport::{HttpResponse, HttpTransport, ReqwestTransport, TransportError};

/// Largest size the Static API serves without a premium plan.
pub const MAX_WIDTH: u32 = 640;
pub const MAX_HEIGHT: u32 = 640;

/// Absolute timeout for every single HTTP attempt.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Metadata status returned when no imagery exists near the coordinates.
const ZERO_RESULTS: &str = "ZERO_RESULTS";

static API_KEY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"key=[^&]*").unwrap_or_else(|e| panic!("API key pattern must compile: {e}"))
});

/// Replace every `key=...` query value so the text is safe to log.
pub fn redact(text: &str) -> String {
    API_KEY_PATTERN.replace_all(text, "key=[REDACTED]").into_owned()
}

#[derive(Clone)]
pub struct StreetViewApiConfig {
    pub endpoint: String,
    pub width: u32,
    pub height: u32,
    pub fov: u32,
    pub api_key: Zeroizing<String>,
    pub retry: RetryPolicy,
}

impl Default for StreetViewApiConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://maps.googleapis.com/maps/api/streetview".to_string(),
            width: 400,
            height: 400,
            fov: 90,
            api_key: Zeroizing::new(String::new()),
            retry: RetryPolicy::from_secs(5, 10),
        }
    }
}

impl fmt::Debug for StreetViewApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreetViewApiConfig")
            .field("endpoint", &self.endpoint)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("fov", &self.fov)
            .field("api_key", &"[REDACTED]")
            .field("retry", &self.retry)
            .finish()
    }
}

/// Anything that can produce raw image bytes for a coordinate pair.
#[async_trait]
pub trait ImageSource: Send + Sync {
    /// Fails with a user error when no imagery exists at the coordinates,
    /// with an application error for every other failure.
    async fn fetch(&self, latitude: f64, longitude: f64) -> Result<Vec<u8>>;
}

pub struct StreetViewClient {
    config: StreetViewApiConfig,
    transport: Arc<dyn HttpTransport>,
    logger: Arc<LoggingChain>,
}

impl StreetViewClient {
    pub fn new(
        config: StreetViewApiConfig,
        transport: Arc<dyn HttpTransport>,
        logger: Arc<LoggingChain>,
    ) -> Self {
        Self {
            config,
            transport,
            logger,
        }
    }

    fn size(&self) -> String {
        format!(
            "{}x{}",
            self.config.width.min(MAX_WIDTH),
            self.config.height.min(MAX_HEIGHT)
        )
    }

    /// Image URL and its sibling metadata URL, identical query. The key
    /// is appended last.
    fn build_urls(&self, latitude: f64, longitude: f64) -> Result<(Url, Url)> {
        let mut image_url = Url::parse(&self.config.endpoint).map_err(|e| {
            RetrievalError::application(format!(
                "Unable to build url for request. Endpoint: '{}', error: '{e}'",
                self.config.endpoint
            ))
        })?;

        image_url
            .query_pairs_mut()
            .append_pair("size", &self.size())
            .append_pair("location", &format!("{latitude:.6},{longitude:.6}"))
            .append_pair("fov", &self.config.fov.to_string())
            .append_pair("key", &self.config.api_key);

        let mut metadata_url = image_url.clone();
        metadata_url
            .path_segments_mut()
            .map_err(|()| {
                RetrievalError::application(format!(
                    "Unable to build metadata url for request. Endpoint: '{}'",
                    self.config.endpoint
                ))
            })?
            .pop_if_empty()
            .push("metadata");

        Ok((image_url, metadata_url))
    }

    async fn get_ok(&self, url: &Url) -> std::result::Result<HttpResponse, TransportError> {
        let response = self.transport.get(url, REQUEST_TIMEOUT).await?;
        if !response.is_ok() {
            return Err(TransportError::UnexpectedStatus(response.status));
        }
        Ok(response)
    }

    /// Free existence check. Exhausting the retries also counts as "no
    /// imagery", after logging every attempt's failure.
    async fn image_exists(&self, metadata_url: &Url) -> bool {
        let loggable = redact(metadata_url.as_str());
        self.logger
            .debug(&format!("Making request for metadata to: {loggable}"))
            .await;

        match self.config.retry.execute(|| self.get_ok(metadata_url)).await {
            Ok(response) => !String::from_utf8_lossy(&response.body).contains(ZERO_RESULTS),
            Err(exhausted) => {
                self.logger
                    .error(&exhaustion_message(&loggable, &exhausted))
                    .await;
                false
            }
        }
    }
}

fn exhaustion_message(loggable_url: &str, exhausted: &RetryExhausted<TransportError>) -> String {
    redact(&format!(
        "Error making request to: '{loggable_url}', errors: '{exhausted}'"
    ))
}

#[async_trait]
impl ImageSource for StreetViewClient {
    #[instrument(skip(self))]
    async fn fetch(&self, latitude: f64, longitude: f64) -> Result<Vec<u8>> {
        let (image_url, metadata_url) = self.build_urls(latitude, longitude)?;

        if !self.image_exists(&metadata_url).await {
            return Err(RetrievalError::user(
                codes::INVALID_LOCATION,
                messages::INVALID_LOCATION,
            ));
        }

        let loggable = redact(image_url.as_str());
        self.logger
            .debug(&format!("Making request to: {loggable}"))
            .await;

        let response = self
            .config
            .retry
            .execute(|| self.get_ok(&image_url))
            .await
            .map_err(|exhausted| {
                RetrievalError::application(exhaustion_message(&loggable, &exhausted))
            })?;

        self.logger
            .debug(&format!(
                "Received Street View API response, status: '{}', bytes: '{}'",
                response.status,
                response.body.len()
            ))
            .await;

        Ok(response.body)
    }
}
