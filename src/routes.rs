//! Top-level router configuration.
//!
//! # Route Structure
//!
//! - `GET  /track/open/{encoded}`   - Open pixel (public)
//! - `GET  /track/click/{encoded}`  - Click redirect (public)
//! - `GET  /health`                 - Health check: event store, event queue, webhook
//!
//! # Middleware
//!
//! - **Tracing** - Structured request/response logging by route template
//! - **Path normalization** - Trailing slash handling (some mail proxies append one)

use crate::api;
use crate::api::handlers::health_handler;
use crate::api::middleware::tracing;
use crate::state::AppState;
use axum::Router;
use axum::routing::get;
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};

/// Constructs the application router with all routes and middleware.
pub fn app_router(state: AppState) -> NormalizePath<Router> {
    let router = Router::new()
        .nest("/track", api::routes::tracking_routes())
        .route("/health", get(health_handler))
        .with_state(state)
        .layer(tracing::layer());

    NormalizePathLayer::trim_trailing_slash().layer(router)
}
