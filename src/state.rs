//! Shared application state injected into all HTTP handlers.

use std::sync::Arc;

use crate::application::services::{EventRecorder, TrackingEndpoint};
use crate::infrastructure::webhook::WebhookSink;

/// Application state cloned into every request.
///
/// The endpoint holds the sending half of the event queue; the recorder and webhook are
/// shared with the background worker and only read here for health reporting.
#[derive(Clone)]
pub struct AppState {
    pub endpoint: TrackingEndpoint,
    pub recorder: Arc<EventRecorder>,
    pub webhook: Arc<dyn WebhookSink>,
    /// When true, the client IP is read from X-Forwarded-For / X-Real-IP headers.
    pub behind_proxy: bool,
}

impl AppState {
    pub fn new(
        endpoint: TrackingEndpoint,
        recorder: Arc<EventRecorder>,
        webhook: Arc<dyn WebhookSink>,
        behind_proxy: bool,
    ) -> Self {
        Self {
            endpoint,
            recorder,
            webhook,
            behind_proxy,
        }
    }
}
