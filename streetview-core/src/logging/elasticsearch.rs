//! Search-indexed remote log sink backed by Elasticsearch.
//!
//! Nothing touches the network at construction: the first record triggers the
//! hook setup (a reachability check followed by spawning the shipping task),
//! retried with the configured policy. Once installed the hook is reused and
//! records are handed to the shipping task without waiting for the index
//! response. The hand-off queue is bounded: when it is full the record is
//! refused so the chain falls through to the next backend.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::OnceCell;
use tracing::{info, warn};
use uuid::Uuid;

use super::{Fields, LogBackend, LogError, LogRecord, RequiredFields, Severity};
use crate::retry::RetryPolicy;

/// Per-request timeout for the reachability check and for shipping a record.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Records waiting for the shipping task.
const SHIPPING_QUEUE_CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
pub struct ElasticsearchConfig {
    pub host: String,
    pub port: u16,
    pub index: String,
    pub retry: RetryPolicy,
}

impl Default for ElasticsearchConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 9200,
            index: "palmago".to_string(),
            retry: RetryPolicy::from_secs(1, 3),
        }
    }
}

impl ElasticsearchConfig {
    /// Plain HTTP only.
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    pub fn document_url(&self) -> String {
        format!("{}/{}/_doc", self.base_url(), self.index)
    }
}

pub struct ElasticsearchSink {
    config: ElasticsearchConfig,
    client: Client,
    required: RequiredFields,
    shipper: OnceCell<mpsc::Sender<Value>>,
}

impl ElasticsearchSink {
    pub fn new(config: ElasticsearchConfig, env: impl Into<String>) -> Result<Self, LogError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| LogError::Unavailable(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            config,
            client,
            required: RequiredFields::new(env),
            shipper: OnceCell::new(),
        })
    }

    /// Whether the hook has been installed yet.
    pub fn is_connected(&self) -> bool {
        self.shipper.initialized()
    }

    async fn shipper(&self) -> Result<&mpsc::Sender<Value>, LogError> {
        self.shipper
            .get_or_try_init(|| async {
                self.config
                    .retry
                    .execute(|| self.install_hook())
                    .await
                    .map_err(|exhausted| LogError::Unavailable(exhausted.to_string()))
            })
            .await
    }

    async fn install_hook(&self) -> Result<mpsc::Sender<Value>, LogError> {
        let base_url = self.config.base_url();

        let response = self
            .client
            .get(&base_url)
            .send()
            .await
            .map_err(|e| LogError::Unavailable(format!("{base_url}: {}", e.without_url())))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LogError::Unavailable(format!(
                "{base_url} returned status: {status}"
            )));
        }

        let (sender, receiver) = mpsc::channel(SHIPPING_QUEUE_CAPACITY);
        tokio::spawn(ship_records(
            self.client.clone(),
            self.config.document_url(),
            receiver,
        ));

        info!(url = %base_url, index = %self.config.index, "Elasticsearch log hook installed");
        Ok(sender)
    }
}

fn enqueue(sender: &mpsc::Sender<Value>, record: Value) -> Result<(), LogError> {
    sender.try_send(record).map_err(|err| match err {
        TrySendError::Full(_) => {
            LogError::Unavailable("Elasticsearch shipping queue is full".into())
        }
        TrySendError::Closed(_) => {
            LogError::Unavailable("Elasticsearch shipping task has stopped".into())
        }
    })
}

async fn ship_records(client: Client, url: String, mut receiver: mpsc::Receiver<Value>) {
    while let Some(record) = receiver.recv().await {
        match client.post(&url).json(&record).send().await {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => {
                warn!(status = %response.status(), "Elasticsearch rejected log record");
            }
            Err(e) => {
                warn!(error = %e.without_url(), "Failed to ship log record to Elasticsearch");
            }
        }
    }
}

#[async_trait]
impl LogBackend for ElasticsearchSink {
    fn name(&self) -> &'static str {
        "elasticsearch"
    }

    async fn log(&self, severity: Severity, message: &str, fields: &Fields) -> Result<(), LogError> {
        let shipper = self.shipper().await?;

        let record = LogRecord::new(severity, message, self.required.merge(fields));
        let value = serde_json::to_value(&record).map_err(|e| LogError::Write(e.to_string()))?;

        enqueue(shipper, value)
    }

    fn update_correlation_id(&self, correlation_id: Uuid) {
        self.required.set_correlation_id(correlation_id);
    }
}
