//! Webhook forwarding of decoded tracking events.
//!
//! Provides a [`WebhookSink`] trait with two implementations:
//! - [`HttpWebhook`] - JSON `POST` with a bounded timeout and optional HMAC signature
//! - [`NullWebhook`] - No-op when forwarding is disabled

mod http_webhook;
mod null_webhook;
mod service;
pub mod signature;

pub use http_webhook::{HttpWebhook, WebhookPayload};
pub use null_webhook::NullWebhook;
pub use service::WebhookSink;
