//! Error taxonomy for the tracking core.
//!
//! Errors fall into two groups with different propagation rules:
//!
//! - **Preparation time** ([`EncodingError`], [`MalformedHtmlError`], [`AdaptError`]) -
//!   raised while building tracked email content. These are caller bugs and propagate
//!   synchronously to whoever is preparing the email.
//! - **Fetch time** ([`DecodingError`], [`RecorderError`], [`WebhookError`]) - raised while
//!   serving a tracking request. The endpoint recovers from all of them locally; a
//!   recipient always gets a pixel or a redirect.

use axum::http::StatusCode;

use crate::domain::TrackingKind;

/// Failure to turn a payload into a tracking URL.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EncodingError {
    #[error("click payload requires a target URL")]
    MissingTargetUrl,

    #[error("open payload must not carry a target URL")]
    UnexpectedTargetUrl,

    #[error("target URL is not an absolute http(s) URL: {0}")]
    InvalidTargetUrl(String),

    #[error("metadata nesting depth {depth} exceeds the limit of {max}")]
    MetadataTooDeep { depth: usize, max: usize },

    #[error("encoded payload is {len} bytes, limit is {max}")]
    TooLarge { len: usize, max: usize },

    #[error("failed to serialize payload: {0}")]
    Serialization(String),

    #[error("failed to encrypt payload")]
    Encryption,

    #[error("random nonce generation failed")]
    Entropy,
}

/// Failure to recover a payload from an encoded path segment.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DecodingError {
    #[error("path segment is empty")]
    Empty,

    #[error("path segment is not valid URL-safe base64")]
    InvalidEncoding,

    #[error("payload failed authentication (tampered or wrong key)")]
    Authentication,

    #[error("payload is not well-formed: {0}")]
    MalformedPayload(String),

    #[error("payload violates its invariant: {0}")]
    InvalidPayload(#[from] EncodingError),

    #[error("expected a {expected} payload, found {found}")]
    UnexpectedKind {
        expected: TrackingKind,
        found: TrackingKind,
    },
}

/// The input document could not be scanned as HTML.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("malformed HTML at byte {offset}: {reason}")]
pub struct MalformedHtmlError {
    pub offset: usize,
    pub reason: &'static str,
}

impl MalformedHtmlError {
    pub fn new(offset: usize, reason: &'static str) -> Self {
        Self { offset, reason }
    }
}

/// Failure of [`crate::application::services::HtmlAdapter::adapt`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AdaptError {
    #[error(transparent)]
    MalformedHtml(#[from] MalformedHtmlError),

    #[error(transparent)]
    Encoding(#[from] EncodingError),
}

/// Failure of the event store while applying a tracking result.
#[derive(Debug, thiserror::Error)]
pub enum RecorderError {
    #[error("event store error: {0}")]
    Storage(String),

    #[error("event store did not respond within {0} ms")]
    Timeout(u64),

    #[error("event store commit was not acknowledged: {0}")]
    Unconfirmed(String),

    #[error("event cannot be recorded: {0}")]
    InvalidEvent(String),
}

impl RecorderError {
    /// Whether retrying the same call may succeed without applying the event twice.
    ///
    /// A timeout or an unacknowledged commit leaves the write in an unknown state, so
    /// neither is retried.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}

impl From<sqlx::Error> for RecorderError {
    fn from(e: sqlx::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

/// Failure to deliver a webhook notification.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("webhook request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("webhook endpoint answered {0}")]
    Status(StatusCode),

    #[error("failed to serialize webhook payload: {0}")]
    Serialization(#[from] serde_json::Error),
}
