use thiserror::Error;

/// Stable codes carried by caller-facing errors. The protocol mapper keys on these.
pub mod codes {
    pub const EMPTY_CORRELATION_ID: &str = "EmptyCorrelationId";
    pub const INVALID_CORRELATION_ID: &str = "InvalidCorrelationId";
    pub const INVALID_LOCATION: &str = "InvalidLocation";
}

/// Caller-safe messages paired with [`codes`].
pub mod messages {
    pub const EMPTY_CORRELATION_ID: &str =
        "invalid correlation id provided, it must not be empty nor a blank string";
    pub const INVALID_CORRELATION_ID: &str =
        "invalid non-version-4 uuid provided, example v4 format: acca4678-fbbd-43b9-9d8a-83f8794935cb";
    pub const INVALID_LOCATION: &str =
        "invalid location provided: the coordinates do not correspond to a valid street view image";
}

/// Every failure leaving the retrieval pipeline is exactly one of these.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RetrievalError {
    /// Caused by the caller's input. Safe to show externally.
    #[error("{message}")]
    User { code: String, message: String },

    /// Operational failure. Logged, never shown verbatim.
    #[error("{0}")]
    Application(String),
}

impl RetrievalError {
    pub fn user(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::User {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn application(message: impl Into<String>) -> Self {
        Self::Application(message.into())
    }

    /// The stable code, present only on caller-facing errors.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::User { code, .. } => Some(code),
            Self::Application(_) => None,
        }
    }

    pub fn is_user_error(&self) -> bool {
        matches!(self, Self::User { .. })
    }
}

pub type Result<T> = std::result::Result<T, RetrievalError>;
