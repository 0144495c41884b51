use async_trait::async_trait;
use serde_json::json;
use tracing::warn;

use crate::notify::Notifier;

/// Slack incoming webhook notification sink
pub struct SlackWebhook {
    webhook_url: String,
    channel: Option<String>,
    http: reqwest::Client,
}

impl SlackWebhook {
    pub fn new(webhook_url: String, channel: Option<String>) -> Self {
        Self {
            webhook_url,
            channel,
            http: reqwest::Client::new(),
        }
    }

    fn payload(&self, message: &str) -> serde_json::Value {
        match &self.channel {
            Some(channel) => json!({ "text": message, "channel": channel }),
            None => json!({ "text": message }),
        }
    }

    async fn post(&self, payload: serde_json::Value) -> anyhow::Result<()> {
        let resp = self
            .http
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "Slack webhook returned non-success");
            anyhow::bail!("Slack webhook returned {status}");
        }

        Ok(())
    }
}

#[async_trait]
impl Notifier for SlackWebhook {
    async fn notify(&self, message: &str) {
        if let Err(e) = self.post(self.payload(message)).await {
            warn!(error = %e, "Failed to deliver notification: {}", message);
        }
    }
}
