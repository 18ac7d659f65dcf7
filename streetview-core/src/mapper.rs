//! Classification of pipeline errors into the outward status vocabulary.
//!
//! User errors are looked up by code and keep their caller-safe message.
//! Application errors are logged once here and never leave the process: the
//! caller only sees the generic unknown status.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock};

use crate::error::{codes, messages, RetrievalError};
use crate::logging::LoggingChain;

pub const OK_MESSAGE: &str = "The operation completed successfully.";
pub const UNKNOWN_ERROR_MESSAGE: &str = "An unknown error occurred, please retry the request later.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportCode {
    Ok,
    InvalidArgument,
    NotFound,
    Unknown,
}

impl TransportCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::NotFound => "NOT_FOUND",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for TransportCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportStatus {
    pub code: TransportCode,
    pub message: &'static str,
}

impl TransportStatus {
    const fn new(code: TransportCode, message: &'static str) -> Self {
        Self { code, message }
    }

    pub const fn ok() -> Self {
        Self::new(TransportCode::Ok, OK_MESSAGE)
    }

    pub const fn unknown() -> Self {
        Self::new(TransportCode::Unknown, UNKNOWN_ERROR_MESSAGE)
    }

    pub fn is_ok(&self) -> bool {
        self.code == TransportCode::Ok
    }
}

static USER_ERRORS: LazyLock<HashMap<&'static str, TransportStatus>> = LazyLock::new(|| {
    HashMap::from([
        (
            codes::EMPTY_CORRELATION_ID,
            TransportStatus::new(TransportCode::InvalidArgument, messages::EMPTY_CORRELATION_ID),
        ),
        (
            codes::INVALID_CORRELATION_ID,
            TransportStatus::new(TransportCode::InvalidArgument, messages::INVALID_CORRELATION_ID),
        ),
        (
            codes::INVALID_LOCATION,
            TransportStatus::new(TransportCode::NotFound, messages::INVALID_LOCATION),
        ),
    ])
});

pub struct ErrorMapper {
    logger: Arc<LoggingChain>,
}

impl ErrorMapper {
    pub fn new(logger: Arc<LoggingChain>) -> Self {
        Self { logger }
    }

    pub async fn map_to_transport_error(&self, err: Option<&RetrievalError>) -> TransportStatus {
        match err {
            None => TransportStatus::ok(),
            Some(RetrievalError::Application(message)) => {
                self.logger
                    .error(&format!("Received non-user error: {message}"))
                    .await;
                TransportStatus::unknown()
            }
            Some(RetrievalError::User { code, .. }) => USER_ERRORS
                .get(code.as_str())
                .copied()
                .unwrap_or_else(TransportStatus::unknown),
        }
    }
}
