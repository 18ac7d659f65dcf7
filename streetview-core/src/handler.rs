//! Cache-aside retrieval of one Street View image.

use std::sync::Arc;

use serde_json::json;
use tracing::instrument;

use crate::api::ImageSource;
use crate::cache::StreetViewImages;
use crate::error::{Result, RetrievalError};
use crate::image::Image;
use crate::logging::{fields, LoggingChain, Severity};

pub struct GetStreetViewImageHandler {
    images: Arc<dyn StreetViewImages>,
    source: Arc<dyn ImageSource>,
    logger: Arc<LoggingChain>,
}

impl GetStreetViewImageHandler {
    pub fn new(
        images: Arc<dyn StreetViewImages>,
        source: Arc<dyn ImageSource>,
        logger: Arc<LoggingChain>,
    ) -> Self {
        Self {
            images,
            source,
            logger,
        }
    }

    /// Cached bytes when present, otherwise fetch, validate, persist.
    ///
    /// User errors from the source pass through untouched; every other
    /// failure comes back as an application error with context.
    #[instrument(skip(self))]
    pub async fn handle(&self, latitude: f64, longitude: f64) -> Result<Vec<u8>> {
        if let Some(image) = self.images.find(latitude, longitude).await {
            self.logger
                .record(
                    Severity::Debug,
                    "Image retrieved from cache",
                    fields([("key", json!(image.identity().as_str()))]),
                )
                .await;
            return Ok(image.into_bytes());
        }

        let bytes = self
            .source
            .fetch(latitude, longitude)
            .await
            .map_err(|err| match err {
                RetrievalError::User { .. } => err,
                RetrievalError::Application(message) => RetrievalError::application(format!(
                    "Unable to perform request to imagery API, error: {message}"
                )),
            })?;

        let image = Image::new(latitude, longitude, bytes).map_err(|err| {
            RetrievalError::application(format!(
                "Response was not considered a valid image, error: {err}"
            ))
        })?;

        image.persist(self.images.as_ref()).await;

        Ok(image.into_bytes())
    }
}
