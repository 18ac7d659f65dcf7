//! Street View image entity and its coordinate-derived identity.
//!
//! An [`Image`] can only exist for bytes that sniff as `image/jpeg`. The
//! identity is reconstructable from the coordinates alone, so the cache can
//! be queried without ever loading an entity.

use std::fmt;

use thiserror::Error;

use crate::cache::StreetViewImages;

/// The only content type the imagery provider is documented to return.
pub const EXPECTED_CONTENT_TYPE: &str = "image/jpeg";

/// Reported when the leading bytes match no known format.
const UNKNOWN_CONTENT_TYPE: &str = "application/octet-stream";

const IDENTITY_PREFIX: &str = "street_view_image";

/// Stable key for an image, e.g. `street_view_image:51.507351:-0.127758`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageIdentity(String);

impl ImageIdentity {
    /// Derive the identity for a coordinate pair (6-decimal fixed point).
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self(format!("{IDENTITY_PREFIX}:{latitude:.6}:{longitude:.6}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Bytes that did not sniff as the expected content type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("image data should be {EXPECTED_CONTENT_TYPE}, got: '{detected}'")]
pub struct ValidationError {
    /// Content type detected from the payload's magic bytes.
    pub detected: String,
}

/// Validated raw image data for one coordinate pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    identity: ImageIdentity,
    latitude: f64,
    longitude: f64,
    bytes: Vec<u8>,
}

impl Image {
    /// Build an image, rejecting any payload that does not sniff as JPEG.
    pub fn new(latitude: f64, longitude: f64, bytes: Vec<u8>) -> Result<Self, ValidationError> {
        let detected = sniff_content_type(&bytes);
        if detected != EXPECTED_CONTENT_TYPE {
            return Err(ValidationError {
                detected: detected.to_string(),
            });
        }

        Ok(Self {
            identity: ImageIdentity::new(latitude, longitude),
            latitude,
            longitude,
            bytes,
        })
    }

    pub fn identity(&self) -> &ImageIdentity {
        &self.identity
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Store this image in the repository.
    ///
    /// Persistence is an optimization: the outcome is dropped here and any
    /// failure is only visible as a warning logged by the repository.
    pub async fn persist(&self, images: &dyn StreetViewImages) {
        let _ = images.save(self).await;
    }
}

/// Detect a payload's content type from its leading bytes.
pub fn sniff_content_type(bytes: &[u8]) -> &'static str {
    ::image::guess_format(bytes)
        .map(|format| format.to_mime_type())
        .unwrap_or(UNKNOWN_CONTENT_TYPE)
}
