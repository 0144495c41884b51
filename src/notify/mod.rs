//! Outbound run notifications
//!
//! Notifications are fire-and-forget: a sink logs its own failures and never
//! reports them back, so a broken webhook cannot fail a harvesting run.

mod log;
mod slack;

pub use log::LogNotifier;
pub use slack::SlackWebhook;

use crate::config::{Environment, NotifyConfig};
use async_trait::async_trait;
use std::sync::Arc;

/// Pluggable notification sink
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers one message
    async fn notify(&self, message: &str);
}

/// Picks the notification sink for a configuration
///
/// Production runs with a webhook post to it; everything else only logs.
pub fn notifier_from_config(config: &NotifyConfig) -> Arc<dyn Notifier> {
    match (&config.environment, &config.webhook_url) {
        (Environment::Production, Some(url)) => {
            Arc::new(SlackWebhook::new(url.clone(), config.channel.clone()))
        }
        _ => Arc::new(LogNotifier),
    }
}

/// Abort message for an entity whose retries were exhausted
pub fn abort_message(entity_id: crate::topology::EntityId, url: &str) -> String {
    format!("❌: Abort id: {}: {}.", entity_id, url)
}
