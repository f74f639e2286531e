//! No-op webhook for deployments without forwarding.

use async_trait::async_trait;
use tracing::debug;

use super::service::WebhookSink;
use crate::domain::TrackingResult;
use crate::error::WebhookError;

/// A webhook sink that discards every event.
///
/// Used when `WEBHOOK_URL` is not set and in tests that do not care about forwarding.
pub struct NullWebhook;

impl NullWebhook {
    pub fn new() -> Self {
        debug!("Using NullWebhook (forwarding disabled)");
        Self
    }
}

impl Default for NullWebhook {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WebhookSink for NullWebhook {
    async fn forward(&self, _event: &TrackingResult) -> Result<(), WebhookError> {
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        false
    }
}
