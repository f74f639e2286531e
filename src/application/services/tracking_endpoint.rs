//! Fetch-time handling of tracking URLs.

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::application::services::UrlCodec;
use crate::domain::{RequestContext, TrackingKind, TrackingResult};

/// Transparent 1×1 PNG served for every open, valid or not.
pub const PIXEL_PNG: [u8; 67] = [
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
    0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00,
    0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49,
    0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
];

/// Decodes fetched segments and hands accepted events to the background worker.
///
/// The endpoint owns the fallback policy: an open always yields the pixel, a click
/// yields its destination or nothing. Recording and webhook delivery happen after the
/// response, through a bounded queue; a full queue drops the event.
#[derive(Clone)]
pub struct TrackingEndpoint {
    codec: UrlCodec,
    events: mpsc::Sender<TrackingResult>,
}

impl TrackingEndpoint {
    pub fn new(codec: UrlCodec, events: mpsc::Sender<TrackingResult>) -> Self {
        Self { codec, events }
    }

    pub fn codec(&self) -> &UrlCodec {
        &self.codec
    }

    /// Handles an open-pixel fetch. Returns the pixel bytes whatever happens.
    pub fn handle_open(&self, segment: &str, request_context: RequestContext) -> &'static [u8] {
        match self.codec.decode_as(segment, TrackingKind::Open) {
            Ok(payload) => self.dispatch(TrackingResult::new(payload, request_context, Utc::now())),
            Err(e) => {
                metrics::counter!("tracking_decode_failures_total", "route" => "open").increment(1);
                tracing::debug!(error = %e, "Invalid open tracking segment");
            }
        }

        &PIXEL_PNG
    }

    /// Handles a click fetch. Returns the redirect target, or `None` when the segment
    /// does not decode to a click payload.
    pub fn handle_click(&self, segment: &str, request_context: RequestContext) -> Option<String> {
        match self.codec.decode_as(segment, TrackingKind::Click) {
            Ok(payload) => {
                let target = payload.target_url.clone()?;
                self.dispatch(TrackingResult::new(payload, request_context, Utc::now()));
                Some(target)
            }
            Err(e) => {
                metrics::counter!("tracking_decode_failures_total", "route" => "click").increment(1);
                tracing::debug!(error = %e, "Invalid click tracking segment");
                None
            }
        }
    }

    /// Queue slots currently free.
    pub fn queue_capacity(&self) -> usize {
        self.events.capacity()
    }

    pub fn queue_max_capacity(&self) -> usize {
        self.events.max_capacity()
    }

    /// True once the worker has dropped its receiver.
    pub fn is_queue_closed(&self) -> bool {
        self.events.is_closed()
    }

    fn dispatch(&self, result: TrackingResult) {
        match self.events.try_send(result) {
            Ok(()) => {}
            Err(TrySendError::Full(result)) => {
                metrics::counter!("tracking_events_dropped_total").increment(1);
                tracing::warn!(kind = %result.kind, "Event queue full, dropping tracking event");
            }
            Err(TrySendError::Closed(result)) => {
                metrics::counter!("tracking_events_dropped_total").increment(1);
                tracing::error!(kind = %result.kind, "Event worker stopped, dropping tracking event");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Metadata, TrackingConfig, TrackingPayload};
    use std::sync::Arc;

    fn endpoint(capacity: usize) -> (TrackingEndpoint, mpsc::Receiver<TrackingResult>) {
        let codec = UrlCodec::new(Arc::new(TrackingConfig::new(
            "https://t.example.com/track/open",
            "https://t.example.com/track/click",
        )));
        let (tx, rx) = mpsc::channel(capacity);
        (TrackingEndpoint::new(codec, tx), rx)
    }

    fn open_segment(endpoint: &TrackingEndpoint) -> String {
        endpoint
            .codec()
            .encode_segment(&TrackingPayload::open(Metadata::new().with("email_id", 1)))
            .unwrap()
    }

    fn click_segment(endpoint: &TrackingEndpoint) -> String {
        endpoint
            .codec()
            .encode_segment(&TrackingPayload::click(
                "https://example.com/landing",
                Metadata::new().with("email_id", 1),
            ))
            .unwrap()
    }

    #[test]
    fn test_pixel_is_a_png() {
        assert_eq!(PIXEL_PNG.len(), 67);
        assert_eq!(&PIXEL_PNG[..8], b"\x89PNG\r\n\x1a\n");
        assert_eq!(&PIXEL_PNG[PIXEL_PNG.len() - 8..PIXEL_PNG.len() - 4], b"IEND");
    }

    #[tokio::test]
    async fn test_open_dispatches_and_returns_pixel() {
        let (endpoint, mut rx) = endpoint(8);
        let ctx = RequestContext::new(Some("10.1.1.1".into()), Some("Mail/1.0"), None);

        let body = endpoint.handle_open(&open_segment(&endpoint), ctx.clone());

        assert_eq!(body, &PIXEL_PNG[..]);
        let event = rx.try_recv().unwrap();
        assert!(event.is_open());
        assert_eq!(event.request_context, ctx);
    }

    #[tokio::test]
    async fn test_invalid_open_still_returns_pixel() {
        let (endpoint, mut rx) = endpoint(8);

        for segment in ["", "%%%", "bm9wZQ", click_segment(&endpoint).as_str()] {
            assert_eq!(endpoint.handle_open(segment, RequestContext::default()), &PIXEL_PNG[..]);
        }
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_click_returns_target() {
        let (endpoint, mut rx) = endpoint(8);

        let target = endpoint.handle_click(&click_segment(&endpoint), RequestContext::default());

        assert_eq!(target.as_deref(), Some("https://example.com/landing"));
        assert_eq!(
            rx.try_recv().unwrap().target_url.as_deref(),
            Some("https://example.com/landing")
        );
    }

    #[tokio::test]
    async fn test_open_payload_on_click_route_is_not_found() {
        let (endpoint, mut rx) = endpoint(8);

        assert!(endpoint.handle_click(&open_segment(&endpoint), RequestContext::default()).is_none());
        assert!(endpoint.handle_click("garbage", RequestContext::default()).is_none());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_full_queue_drops_without_failing_the_request() {
        let (endpoint, _rx) = endpoint(1);
        let segment = click_segment(&endpoint);

        for _ in 0..3 {
            assert!(endpoint.handle_click(&segment, RequestContext::default()).is_some());
        }
        assert_eq!(endpoint.queue_capacity(), 0);
    }

    #[tokio::test]
    async fn test_closed_queue_still_serves() {
        let (endpoint, rx) = endpoint(4);
        drop(rx);

        assert_eq!(
            endpoint.handle_open(&open_segment(&endpoint), RequestContext::default()),
            &PIXEL_PNG[..]
        );
        assert!(endpoint.handle_click(&click_segment(&endpoint), RequestContext::default()).is_some());
    }
}
