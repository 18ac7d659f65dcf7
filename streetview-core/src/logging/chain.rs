use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use super::{Fields, LogBackend, LogError, Severity};

/// Ordered fallback over several [`LogBackend`]s.
///
/// Every call walks the backends in order and stops at the first one that
/// accepts the record. Calls never fail: when nothing accepts the record it
/// is emitted as a `tracing` error event annotated "could not log anywhere".
pub struct LoggingChain {
    backends: Vec<Arc<dyn LogBackend>>,
}

impl LoggingChain {
    pub fn new(backends: Vec<Arc<dyn LogBackend>>) -> Self {
        Self { backends }
    }

    pub async fn record(&self, severity: Severity, message: &str, fields: Fields) {
        for backend in &self.backends {
            match backend.log(severity, message, &fields).await {
                Ok(()) => return,
                Err(err) => {
                    tracing::debug!(
                        backend = backend.name(),
                        error = %err,
                        "Log backend refused record, falling back"
                    );
                }
            }
        }

        tracing::error!(
            severity = %severity,
            fields = %serde_json::Value::Object(fields),
            "could not log anywhere: {message}"
        );
    }

    pub async fn debug(&self, message: &str) {
        self.record(Severity::Debug, message, Fields::new()).await;
    }

    pub async fn info(&self, message: &str) {
        self.record(Severity::Info, message, Fields::new()).await;
    }

    pub async fn warning(&self, message: &str) {
        self.record(Severity::Warning, message, Fields::new()).await;
    }

    pub async fn error(&self, message: &str) {
        self.record(Severity::Error, message, Fields::new()).await;
    }

    pub fn update_correlation_id(&self, correlation_id: Uuid) {
        for backend in &self.backends {
            backend.update_correlation_id(correlation_id);
        }
    }
}

#[async_trait]
impl LogBackend for LoggingChain {
    fn name(&self) -> &'static str {
        "chain"
    }

    async fn log(&self, severity: Severity, message: &str, fields: &Fields) -> Result<(), LogError> {
        self.record(severity, message, fields.clone()).await;
        Ok(())
    }

    fn update_correlation_id(&self, correlation_id: Uuid) {
        LoggingChain::update_correlation_id(self, correlation_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingBackend;

    fn chain_of(backends: &[&Arc<RecordingBackend>]) -> LoggingChain {
        LoggingChain::new(
            backends
                .iter()
                .map(|backend| Arc::clone(backend) as Arc<dyn LogBackend>)
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_failing_primary_falls_back_to_secondary() {
        let primary = Arc::new(RecordingBackend::failing());
        let secondary = Arc::new(RecordingBackend::new());
        let chain = chain_of(&[&primary, &secondary]);

        chain.debug("debug line").await;
        chain.info("info line").await;
        chain.warning("warning line").await;
        chain.error("error line").await;

        assert_eq!(primary.attempts(), 4);
        assert!(primary.records().is_empty());

        let severities: Vec<_> = secondary.records().iter().map(|r| r.severity).collect();
        assert_eq!(
            severities,
            vec![Severity::Debug, Severity::Info, Severity::Warning, Severity::Error]
        );
    }

    #[tokio::test]
    async fn test_first_success_stops_the_chain() {
        let primary = Arc::new(RecordingBackend::new());
        let secondary = Arc::new(RecordingBackend::new());
        let chain = chain_of(&[&primary, &secondary]);

        chain.info("only once").await;

        assert_eq!(primary.records().len(), 1);
        assert_eq!(secondary.attempts(), 0);
    }

    #[tokio::test]
    async fn test_all_backends_failing_does_not_raise() {
        let primary = Arc::new(RecordingBackend::failing());
        let secondary = Arc::new(RecordingBackend::failing());
        let chain = chain_of(&[&primary, &secondary]);

        chain.error("nobody is listening").await;

        assert_eq!(primary.attempts(), 1);
        assert_eq!(secondary.attempts(), 1);
    }

    #[tokio::test]
    async fn test_chain_as_backend_always_succeeds() {
        let failing = Arc::new(RecordingBackend::failing());
        let chain = chain_of(&[&failing]);

        let result = LogBackend::warning(&chain, "still fine", &Fields::new()).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_update_correlation_id_reaches_every_backend() {
        let primary = Arc::new(RecordingBackend::new());
        let secondary = Arc::new(RecordingBackend::new());
        let chain = chain_of(&[&primary, &secondary]);
        let correlation_id = Uuid::new_v4();

        chain.update_correlation_id(correlation_id);

        assert_eq!(primary.correlation_id(), Some(correlation_id));
        assert_eq!(secondary.correlation_id(), Some(correlation_id));
    }
}
