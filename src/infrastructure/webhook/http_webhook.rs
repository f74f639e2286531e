//! HTTP webhook delivery with reqwest.

use async_trait::async_trait;
use axum::http::header::CONTENT_TYPE;
use chrono::SecondsFormat;
use serde::Serialize;
use std::time::Duration;

use super::service::WebhookSink;
use super::signature::{SIGNATURE_HEADER, sign};
use crate::domain::{Metadata, TrackingKind, TrackingResult, WebhookConfig};
use crate::error::WebhookError;

/// JSON body POSTed for every event.
#[derive(Debug, Serialize)]
pub struct WebhookPayload<'a> {
    pub kind: TrackingKind,
    pub metadata: &'a Metadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_url: Option<&'a str>,
    /// RFC 3339, millisecond precision, UTC.
    pub timestamp: String,
    pub request_context: RequestContextBody<'a>,
}

#[derive(Debug, Serialize)]
pub struct RequestContextBody<'a> {
    pub user_agent: Option<&'a str>,
    pub client_ip: Option<&'a str>,
    pub referrer: Option<&'a str>,
}

impl<'a> From<&'a TrackingResult> for WebhookPayload<'a> {
    fn from(event: &'a TrackingResult) -> Self {
        Self {
            kind: event.kind,
            metadata: &event.metadata,
            target_url: event.target_url.as_deref(),
            timestamp: event.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            request_context: RequestContextBody {
                user_agent: event.request_context.user_agent.as_deref(),
                client_ip: event.request_context.client_ip.as_deref(),
                referrer: event.request_context.referrer.as_deref(),
            },
        }
    }
}

/// Forwards events to one URL.
///
/// Each event is one `POST` bounded by the configured timeout. When a secret is set the
/// body is signed (see [`super::signature`]).
pub struct HttpWebhook {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
    secret: Option<String>,
}

impl HttpWebhook {
    /// Creates a sink from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`WebhookError::Request`] if the HTTP client cannot be built.
    pub fn new(config: &WebhookConfig) -> Result<Self, WebhookError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        tracing::info!(url = %config.url, timeout_ms = config.timeout.as_millis() as u64, "Webhook enabled");

        Ok(Self {
            client,
            url: config.url.clone(),
            timeout: config.timeout,
            secret: config.secret.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl WebhookSink for HttpWebhook {
    async fn forward(&self, event: &TrackingResult) -> Result<(), WebhookError> {
        let body = serde_json::to_vec(&WebhookPayload::from(event))?;

        let mut request = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json");
        if let Some(secret) = &self.secret {
            request = request.header(SIGNATURE_HEADER, sign(&body, secret));
        }

        let response = request.body(body).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(WebhookError::Status(status));
        }

        tracing::debug!(kind = %event.kind, %status, "Webhook delivered");
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        true
    }
}
