//! Result notification
//!
//! Posts the completion record to the callback URL supplied with the task.

use crate::hosting::body_snippet;
use async_trait::async_trait;
use pagesmith_foundation::{with_retry, CompletionRecord, Error, NotifyConfig, Result, RetryConfig};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

/// Delivers completion records
#[async_trait]
pub trait Notifier: Send + Sync {
    /// POST `record` to `url`; anything but HTTP 200 is a failure
    async fn notify(&self, url: &str, record: &CompletionRecord) -> Result<()>;
}

/// [`Notifier`] over HTTP
pub struct HttpNotifier {
    client: Client,
    retry: RetryConfig,
}

impl HttpNotifier {
    pub fn from_config(config: &NotifyConfig, retry: RetryConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("notification HTTP client: {}", e)))?;
        Ok(Self { client, retry })
    }

    async fn post_once(&self, url: &str, record: &CompletionRecord) -> Result<()> {
        let response = self
            .client
            .post(url)
            .json(record)
            .send()
            .await
            .map_err(|e| Error::NotificationFailed {
                status: None,
                message: e.to_string(),
            })?;

        let status = response.status().as_u16();
        debug!("POST {} -> {}", url, status);
        if status == 200 {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(Error::NotificationFailed {
            status: Some(status),
            message: body_snippet(&body),
        })
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn notify(&self, url: &str, record: &CompletionRecord) -> Result<()> {
        with_retry(&self.retry, "evaluation notification", || {
            self.post_once(url, record)
        })
        .await?;
        info!("Notified {} for {} round {}", url, record.task, record.round);
        Ok(())
    }
}
