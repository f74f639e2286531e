//! Decoded tracking event handed from the endpoint to the background worker.

use chrono::{DateTime, Utc};

use super::metadata::Metadata;
use super::payload::{TrackingKind, TrackingPayload};

/// Client information captured from the tracking request.
///
/// All fields are optional: mail proxies routinely strip headers, and the client IP is
/// unavailable when the peer address cannot be trusted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub user_agent: Option<String>,
    pub client_ip: Option<String>,
    pub referrer: Option<String>,
}

impl RequestContext {
    /// Creates a request context.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let ctx = RequestContext::new(
    ///     Some("192.168.1.1".to_string()),
    ///     Some("Mozilla/5.0"),
    ///     Some("https://mail.example.com"),
    /// );
    /// ```
    pub fn new(client_ip: Option<String>, user_agent: Option<&str>, referrer: Option<&str>) -> Self {
        Self {
            client_ip,
            user_agent: user_agent.map(|s| s.to_string()),
            referrer: referrer.map(|s| s.to_string()),
        }
    }
}

/// A decoded, validated tracking fetch.
///
/// Created by the tracking endpoint for every successful decode and passed through a
/// bounded channel to [`crate::domain::event_worker::run_event_worker`], which records it
/// and forwards it to the webhook. The HTTP response never waits for either.
///
/// # Invariant
///
/// `target_url` is present iff `kind` is [`TrackingKind::Click`]; it is inherited from a
/// payload that already passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingResult {
    pub kind: TrackingKind,
    pub metadata: Metadata,
    pub target_url: Option<String>,
    pub request_context: RequestContext,
    pub timestamp: DateTime<Utc>,
}

impl TrackingResult {
    pub fn new(payload: TrackingPayload, request_context: RequestContext, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind: payload.kind,
            metadata: payload.metadata,
            target_url: payload.target_url,
            request_context,
            timestamp,
        }
    }

    pub fn is_open(&self) -> bool {
        self.kind == TrackingKind::Open
    }

    pub fn is_click(&self) -> bool {
        self.kind == TrackingKind::Click
    }
}
