//! The value serialized into a tracking URL.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use super::metadata::{MAX_METADATA_DEPTH, Metadata};
use crate::error::EncodingError;
use crate::utils::tracking_url::is_trackable_url;

/// What a tracking URL records when fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackingKind {
    Open,
    Click,
}

impl TrackingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Click => "click",
        }
    }
}

impl fmt::Display for TrackingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload embedded in a tracking URL.
///
/// # Invariant
///
/// `target_url` is present iff `kind` is [`TrackingKind::Click`]. The constructors
/// [`TrackingPayload::open`] and [`TrackingPayload::click`] uphold it; a payload built
/// by hand is checked by [`TrackingPayload::validate`] before encoding and after decoding.
///
/// The serialized field names are single letters to keep URLs short.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrackingPayload {
    #[serde(rename = "k")]
    pub kind: TrackingKind,

    #[serde(rename = "m", default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,

    #[serde(rename = "u", default, skip_serializing_if = "Option::is_none")]
    pub target_url: Option<String>,

    /// Whole seconds since the epoch on the wire.
    #[serde(
        rename = "t",
        default,
        skip_serializing_if = "Option::is_none",
        with = "chrono::serde::ts_seconds_option"
    )]
    pub issued_at: Option<DateTime<Utc>>,
}

impl TrackingPayload {
    pub fn open(metadata: Metadata) -> Self {
        Self {
            kind: TrackingKind::Open,
            metadata,
            target_url: None,
            issued_at: None,
        }
    }

    pub fn click(target_url: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            kind: TrackingKind::Click,
            metadata,
            target_url: Some(target_url.into()),
            issued_at: None,
        }
    }

    /// Stamps the payload, dropping sub-second precision the wire form cannot carry.
    pub fn issued_at(mut self, at: DateTime<Utc>) -> Self {
        self.issued_at = Some(at.trunc_subsecs(0));
        self
    }

    /// Checks the kind/target invariant and the metadata depth bound.
    ///
    /// # Errors
    ///
    /// - [`EncodingError::MissingTargetUrl`] for a click without a target
    /// - [`EncodingError::UnexpectedTargetUrl`] for an open with a target
    /// - [`EncodingError::InvalidTargetUrl`] when the target is not absolute http(s)
    /// - [`EncodingError::MetadataTooDeep`] when metadata nests past [`MAX_METADATA_DEPTH`]
    pub fn validate(&self) -> Result<(), EncodingError> {
        match (self.kind, self.target_url.as_deref()) {
            (TrackingKind::Click, None) => return Err(EncodingError::MissingTargetUrl),
            (TrackingKind::Open, Some(_)) => return Err(EncodingError::UnexpectedTargetUrl),
            (TrackingKind::Click, Some(target)) if !is_trackable_url(target) => {
                return Err(EncodingError::InvalidTargetUrl(target.to_string()));
            }
            _ => {}
        }

        let depth = self.metadata.depth();
        if depth > MAX_METADATA_DEPTH {
            return Err(EncodingError::MetadataTooDeep {
                depth,
                max: MAX_METADATA_DEPTH,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_satisfy_invariant() {
        let metadata = Metadata::new().with("email_id", 1);

        assert!(TrackingPayload::open(metadata.clone()).validate().is_ok());
        assert!(
            TrackingPayload::click("https://example.com/a", metadata)
                .validate()
                .is_ok()
        );
    }

    #[test]
    fn test_click_without_target_is_rejected() {
        let payload = TrackingPayload {
            kind: TrackingKind::Click,
            metadata: Metadata::new(),
            target_url: None,
            issued_at: None,
        };

        assert_eq!(payload.validate(), Err(EncodingError::MissingTargetUrl));
    }

    #[test]
    fn test_open_with_target_is_rejected() {
        let payload = TrackingPayload {
            kind: TrackingKind::Open,
            metadata: Metadata::new(),
            target_url: Some("https://example.com".to_string()),
            issued_at: None,
        };

        assert_eq!(payload.validate(), Err(EncodingError::UnexpectedTargetUrl));
    }

    #[test]
    fn test_click_target_must_be_http() {
        for target in ["javascript:alert(1)", "mailto:a@b.c", "/relative", "ftp://host/x"] {
            let result = TrackingPayload::click(target, Metadata::new()).validate();
            assert!(
                matches!(result, Err(EncodingError::InvalidTargetUrl(_))),
                "{target} should be rejected"
            );
        }
    }

    #[test]
    fn test_metadata_depth_bound() {
        let mut nested = serde_json::json!(1);
        for _ in 0..MAX_METADATA_DEPTH {
            nested = serde_json::json!([nested]);
        }
        let payload = TrackingPayload::open(Metadata::new().with("deep", nested));

        assert!(matches!(
            payload.validate(),
            Err(EncodingError::MetadataTooDeep { .. })
        ));
    }

    #[test]
    fn test_wire_field_names() {
        let payload = TrackingPayload::click("https://example.com/", Metadata::new().with("a", 1));
        let json = serde_json::to_string(&payload).unwrap();

        assert_eq!(json, r#"{"k":"click","m":{"a":1},"u":"https://example.com/"}"#);
    }

    #[test]
    fn test_issued_at_is_epoch_seconds() {
        let at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let payload = TrackingPayload::open(Metadata::new()).issued_at(at);

        let json = serde_json::to_string(&payload).unwrap();
        assert_eq!(json, r#"{"k":"open","t":1700000000}"#);
        assert_eq!(serde_json::from_str::<TrackingPayload>(&json).unwrap(), payload);
    }

    #[test]
    fn test_issued_at_drops_subseconds() {
        let at = DateTime::from_timestamp(1_700_000_000, 123_456_789).unwrap();
        let payload = TrackingPayload::open(Metadata::new()).issued_at(at);

        assert_eq!(payload.issued_at, DateTime::from_timestamp(1_700_000_000, 0));

        let json = serde_json::to_string(&payload).unwrap();
        assert_eq!(serde_json::from_str::<TrackingPayload>(&json).unwrap(), payload);
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let result = serde_json::from_str::<TrackingPayload>(r#"{"k":"open","x":1}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(TrackingKind::Open.to_string(), "open");
        assert_eq!(TrackingKind::Click.to_string(), "click");
    }
}
