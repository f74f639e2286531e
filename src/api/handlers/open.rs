//! Handler for open-pixel fetches.

use axum::{
    extract::{ConnectInfo, Path, State, rejection::PathRejection},
    http::{HeaderMap, header},
    response::IntoResponse,
};
use std::net::SocketAddr;

use crate::state::AppState;
use crate::utils::request_context::request_context_from_headers;

const NO_CACHE: &str = "no-cache, no-store, must-revalidate";

/// Serves the tracking pixel and records the open.
///
/// # Endpoint
///
/// `GET /track/open/{encoded}`
///
/// # Response
///
/// Always **200 OK** with a transparent 1×1 PNG, whether or not the segment decodes.
/// Mail clients cache aggressively, so every caching header says no.
///
/// # Event Tracking
///
/// A valid open payload is queued for the background worker; the response never waits
/// for recording or webhook delivery.
pub async fn open_handler(
    encoded: Result<Path<String>, PathRejection>,
    State(state): State<AppState>,
    headers: HeaderMap,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> impl IntoResponse {
    let encoded = encoded.map(|Path(segment)| segment).unwrap_or_default();
    let request_context = request_context_from_headers(&headers, addr, state.behind_proxy);

    let pixel = state.endpoint.handle_open(&encoded, request_context);

    (
        [
            (header::CONTENT_TYPE, "image/png"),
            (header::CACHE_CONTROL, NO_CACHE),
            (header::PRAGMA, "no-cache"),
            (header::EXPIRES, "0"),
        ],
        pixel,
    )
}
