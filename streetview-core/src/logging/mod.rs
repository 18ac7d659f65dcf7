//! Application logging with ordered fallback.
//!
//! Records go to the first backend that accepts them: the search-indexed
//! remote sink when it is reachable, the local backup file otherwise. If every
//! backend refuses, [`LoggingChain`] emits the record as a `tracing` event so
//! it still reaches the process output.
//!
//! Each record carries the required fields (`env`, `correlation_id`) merged
//! under any per-call fields.

mod chain;
mod elasticsearch;
mod file;

use std::future::Future;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

pub use chain::LoggingChain;
pub use elasticsearch::{ElasticsearchConfig, ElasticsearchSink};
pub use file::FileSink;

/// Optional structured fields attached to a single record.
pub type Fields = serde_json::Map<String, serde_json::Value>;

/// Build [`Fields`] from literal key/value pairs.
pub fn fields<const N: usize>(pairs: [(&str, serde_json::Value); N]) -> Fields {
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum LogError {
    #[error("log sink unavailable: {0}")]
    Unavailable(String),

    #[error("failed to write log record: {0}")]
    Write(String),

    #[error("failed to open backup log file: {0}")]
    Open(#[from] std::io::Error),
}

/// A single logging destination. Failure means "try the next one".
#[async_trait]
pub trait LogBackend: Send + Sync {
    /// Short name used in diagnostics when this backend is skipped.
    fn name(&self) -> &'static str;

    async fn log(&self, severity: Severity, message: &str, fields: &Fields) -> Result<(), LogError>;

    /// Replace the correlation id injected into every later record.
    fn update_correlation_id(&self, correlation_id: Uuid);

    async fn debug(&self, message: &str, fields: &Fields) -> Result<(), LogError> {
        self.log(Severity::Debug, message, fields).await
    }

    async fn info(&self, message: &str, fields: &Fields) -> Result<(), LogError> {
        self.log(Severity::Info, message, fields).await
    }

    async fn warning(&self, message: &str, fields: &Fields) -> Result<(), LogError> {
        self.log(Severity::Warning, message, fields).await
    }

    async fn error(&self, message: &str, fields: &Fields) -> Result<(), LogError> {
        self.log(Severity::Error, message, fields).await
    }
}

tokio::task_local! {
    static REQUEST_CORRELATION_ID: Uuid;
}

/// Run `future` with `correlation_id` attached to every record it logs.
///
/// Scoped ids win over the backend-wide id, so concurrent requests never see
/// each other's id.
pub async fn with_correlation_id<F: Future>(correlation_id: Uuid, future: F) -> F::Output {
    REQUEST_CORRELATION_ID.scope(correlation_id, future).await
}

/// Fields present on every record a backend writes.
#[derive(Debug)]
pub struct RequiredFields {
    env: String,
    correlation_id: RwLock<Uuid>,
}

impl RequiredFields {
    /// The initial correlation id is random until a caller replaces it.
    pub fn new(env: impl Into<String>) -> Self {
        Self {
            env: env.into(),
            correlation_id: RwLock::new(Uuid::new_v4()),
        }
    }

    pub fn env(&self) -> &str {
        &self.env
    }

    pub fn set_correlation_id(&self, correlation_id: Uuid) {
        *self
            .correlation_id
            .write()
            .unwrap_or_else(PoisonError::into_inner) = correlation_id;
    }

    pub fn correlation_id(&self) -> Uuid {
        REQUEST_CORRELATION_ID
            .try_with(|id| *id)
            .unwrap_or_else(|_| *self.correlation_id.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Required fields as the base, per-call fields layered on top.
    pub fn merge(&self, fields: &Fields) -> Fields {
        let mut merged = Fields::new();
        merged.insert("env".into(), self.env.clone().into());
        merged.insert(
            "correlation_id".into(),
            self.correlation_id().to_string().into(),
        );
        for (key, value) in fields {
            merged.insert(key.clone(), value.clone());
        }
        merged
    }
}

/// The serialized shape shared by every sink.
#[derive(Debug, Serialize)]
pub struct LogRecord<'a> {
    #[serde(rename = "@timestamp")]
    pub timestamp: DateTime<Utc>,
    pub level: Severity,
    pub message: &'a str,
    #[serde(flatten)]
    pub fields: Fields,
}

impl<'a> LogRecord<'a> {
    pub fn new(severity: Severity, message: &'a str, fields: Fields) -> Self {
        Self {
            timestamp: Utc::now(),
            level: severity,
            message,
            fields,
        }
    }
}
