//! Append-only log entry for one accepted tracking fetch.

use chrono::{DateTime, Utc};

use crate::domain::{RequestContext, TrackingKind};

/// A recorded open or click.
///
/// Every accepted fetch appends one record, including opens that did not change the
/// email's [`super::OpenState`]. Records are never updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    pub email_id: String,
    pub kind: TrackingKind,
    pub timestamp: DateTime<Utc>,
    /// Destination of a click; always `None` for opens.
    pub target_url: Option<String>,
    pub request_context: RequestContext,
}

impl EventRecord {
    pub fn open(email_id: impl Into<String>, timestamp: DateTime<Utc>, request_context: RequestContext) -> Self {
        Self {
            email_id: email_id.into(),
            kind: TrackingKind::Open,
            timestamp,
            target_url: None,
            request_context,
        }
    }

    pub fn click(
        email_id: impl Into<String>,
        timestamp: DateTime<Utc>,
        target_url: impl Into<String>,
        request_context: RequestContext,
    ) -> Self {
        Self {
            email_id: email_id.into(),
            kind: TrackingKind::Click,
            timestamp,
            target_url: Some(target_url.into()),
            request_context,
        }
    }
}
