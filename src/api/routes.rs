//! Tracking route configuration.

use crate::api::handlers::{click_handler, open_handler};
use crate::state::AppState;
use axum::{Router, routing::get};

/// Public tracking routes. `GET` registrations also answer `HEAD`.
///
/// # Endpoints
///
/// - `GET /track/open/{encoded}`  - Open pixel
/// - `GET /track/click/{encoded}` - Click redirect
///
/// The bare prefixes are routed too, so an empty segment still gets the pixel (opens)
/// or the invalid-link page (clicks) instead of a router 404.
pub fn tracking_routes() -> Router<AppState> {
    Router::new()
        .route("/open", get(open_handler))
        .route("/open/{encoded}", get(open_handler))
        .route("/click", get(click_handler))
        .route("/click/{encoded}", get(click_handler))
}
