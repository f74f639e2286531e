//! Domain layer: tracking payloads, engagement state and the event pipeline.
//!
//! Nothing here performs I/O directly. Storage is reached through
//! [`repositories::EventRepository`], implemented by the infrastructure layer.
//!
//! # Architecture
//!
//! - [`payload`] - What a tracking URL carries ([`TrackingPayload`], [`TrackingKind`])
//! - [`metadata`] - Caller-defined key/value data carried inside the payload
//! - [`tracking_result`] - A decoded fetch plus its [`RequestContext`]
//! - [`tracking_config`] - Immutable configuration shared by the core components
//! - [`entities`] - Per-email engagement state and the event log entries
//! - [`repositories`] - Storage trait definitions
//! - [`event_worker`] - Background recorder and webhook dispatch
//!
//! # Event Flow
//!
//! 1. The HTTP handler decodes the path segment and answers immediately
//! 2. A [`TrackingResult`] is pushed onto a bounded channel
//! 3. [`event_worker::run_event_worker`] records it with retry and a timeout
//! 4. The event is forwarded to the configured webhook, if any

pub mod entities;
pub mod event_worker;
pub mod metadata;
pub mod payload;
pub mod repositories;
pub mod tracking_config;
pub mod tracking_result;

pub use metadata::{MAX_METADATA_DEPTH, Metadata};
pub use payload::{TrackingKind, TrackingPayload};
pub use tracking_config::{EncryptionKey, TrackingConfig, WebhookConfig};
pub use tracking_result::{RequestContext, TrackingResult};
