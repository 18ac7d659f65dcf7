//! Hand-written doubles shared by the unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use uuid::Uuid;

use crate::api::ImageSource;
use crate::error::{RetrievalError, Result};
use crate::logging::{Fields, LogBackend, LogError, LoggingChain, Severity};

/// Smallest prefix that sniffs as `image/jpeg`.
pub const JPEG_BYTES: &[u8] = &[
    0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00, 0x01,
];

pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n\x00\x00\x00\x0dIHDR";

#[derive(Debug, Clone)]
pub struct RecordedLog {
    pub severity: Severity,
    pub message: String,
    pub fields: Fields,
}

/// Captures records in memory, or refuses every record when failing.
#[derive(Default)]
pub struct RecordingBackend {
    fail: bool,
    attempts: AtomicUsize,
    records: Mutex<Vec<RecordedLog>>,
    correlation_id: Mutex<Option<Uuid>>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn records(&self) -> Vec<RecordedLog> {
        self.records.lock().unwrap().clone()
    }

    pub fn records_at(&self, severity: Severity) -> Vec<RecordedLog> {
        self.records()
            .into_iter()
            .filter(|record| record.severity == severity)
            .collect()
    }

    pub fn correlation_id(&self) -> Option<Uuid> {
        *self.correlation_id.lock().unwrap()
    }
}

#[async_trait]
impl LogBackend for RecordingBackend {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn log(&self, severity: Severity, message: &str, fields: &Fields) -> std::result::Result<(), LogError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(LogError::Unavailable("recording backend set to fail".into()));
        }

        self.records.lock().unwrap().push(RecordedLog {
            severity,
            message: message.to_string(),
            fields: fields.clone(),
        });
        Ok(())
    }

    fn update_correlation_id(&self, correlation_id: Uuid) {
        *self.correlation_id.lock().unwrap() = Some(correlation_id);
    }
}

/// A chain whose only backend records everything.
pub fn recording_chain() -> (Arc<RecordingBackend>, Arc<LoggingChain>) {
    let backend = Arc::new(RecordingBackend::new());
    let chain = LoggingChain::new(vec![Arc::clone(&backend) as Arc<dyn LogBackend>]);
    (backend, Arc::new(chain))
}

/// Replays scripted fetch outcomes in order, then keeps repeating the last.
pub struct StubSource {
    outcomes: Mutex<VecDeque<Result<Vec<u8>>>>,
    calls: AtomicUsize,
}

impl StubSource {
    pub fn new(outcomes: Vec<Result<Vec<u8>>>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn returning(bytes: &[u8]) -> Self {
        Self::new(vec![Ok(bytes.to_vec())])
    }

    pub fn failing(err: RetrievalError) -> Self {
        Self::new(vec![Err(err)])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageSource for StubSource {
    async fn fetch(&self, _latitude: f64, _longitude: f64) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut outcomes = self.outcomes.lock().unwrap();
        if outcomes.len() > 1 {
            return outcomes.pop_front().unwrap();
        }
        outcomes
            .front()
            .cloned()
            .unwrap_or_else(|| Err(RetrievalError::application("no scripted outcome")))
    }
}
