//! Request validation module
//!
//! Checks applied at the HTTP boundary before the retrieval pipeline runs.

use streetview_core::{codes, messages, RetrievalError};
use uuid::{Uuid, Version};

/// Validates the caller-supplied correlation id
///
/// The value must be non-empty after trimming and parse as a version-4 UUID.
pub fn validate_correlation_id(raw: &str) -> Result<Uuid, RetrievalError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(RetrievalError::user(
            codes::EMPTY_CORRELATION_ID,
            messages::EMPTY_CORRELATION_ID,
        ));
    }

    match Uuid::parse_str(trimmed) {
        Ok(id) if id.get_version() == Some(Version::Random) => Ok(id),
        _ => Err(RetrievalError::user(
            codes::INVALID_CORRELATION_ID,
            messages::INVALID_CORRELATION_ID,
        )),
    }
}
