//! Application layer services implementing the tracking workflow.
//!
//! Services are built from an immutable [`crate::domain::TrackingConfig`] and repository
//! traits; HTTP handlers and the CLI only talk to these types.
//!
//! # Available Services
//!
//! - [`services::UrlCodec`] - Encodes payloads into tracking URLs and back
//! - [`services::HtmlAdapter`] - Injects the open pixel and click links into HTML
//! - [`services::TrackingEndpoint`] - Fetch-time decode, fallback policy and dispatch
//! - [`services::EventRecorder`] - Idempotent opens and click counting

pub mod services;
