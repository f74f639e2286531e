//! Tracking services: codec, HTML adapter, fetch-time endpoint and event recorder.

pub mod event_recorder;
pub mod html_adapter;
pub mod tracking_endpoint;
pub mod url_codec;

pub use event_recorder::{EventRecorder, RecordOutcome};
pub use html_adapter::{HtmlAdapter, ORIGINAL_URL_KEY};
pub use tracking_endpoint::{PIXEL_PNG, TrackingEndpoint};
pub use url_codec::UrlCodec;
