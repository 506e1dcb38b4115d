use crate::types::{Result, WorkflowError};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Best-effort delivery of run outcome signals. Callers decide whether a
/// delivery failure matters; the workflow engine logs and discards it.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, message: &str) -> Result<()>;
}

/// Sends the message as a `text` query parameter in a GET to the configured
/// webhook.
pub struct WebhookNotifier {
    client: Client,
    webhook_url: String,
}

impl WebhookNotifier {
    pub fn new(webhook_url: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .expect("Failed to create HTTP client");
        Self {
            client,
            webhook_url,
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, message: &str) -> Result<()> {
        let response = self
            .client
            .get(&self.webhook_url)
            .query(&[("text", message)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(WorkflowError::General(format!(
                "webhook returned {}",
                status
            )));
        }
        debug!(message, "notification delivered");
        Ok(())
    }
}
