//! Webhook sink trait.

use async_trait::async_trait;

use crate::domain::TrackingResult;
use crate::error::WebhookError;

/// Destination for decoded tracking events.
///
/// Delivery is best effort: callers log a returned error and move on. Implementations
/// must bound every call with a timeout and must not retry.
///
/// # Implementations
///
/// - [`crate::infrastructure::webhook::HttpWebhook`] - JSON `POST` to a configured URL
/// - [`crate::infrastructure::webhook::NullWebhook`] - No-op when no webhook is configured
#[async_trait]
pub trait WebhookSink: Send + Sync {
    /// Delivers one event.
    ///
    /// # Errors
    ///
    /// Returns [`WebhookError`] on network failures, timeouts and non-2xx answers.
    async fn forward(&self, event: &TrackingResult) -> Result<(), WebhookError>;

    /// Whether events actually leave the process. Reported by the health endpoint.
    fn is_enabled(&self) -> bool;
}
