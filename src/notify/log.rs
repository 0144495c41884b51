use crate::notify::Notifier;
use async_trait::async_trait;

/// Notification sink that only writes to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, message: &str) {
        tracing::info!(target: "review_harvest::notify", "{}", message);
    }
}
