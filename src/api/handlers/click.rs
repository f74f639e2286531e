//! Handler for tracked link clicks.

use axum::{
    extract::{ConnectInfo, Path, State, rejection::PathRejection},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;

use crate::state::AppState;
use crate::utils::request_context::request_context_from_headers;

const INVALID_LINK: &str = "Invalid tracking link";

/// Redirects a tracked link to its destination.
///
/// # Endpoint
///
/// `GET /track/click/{encoded}`
///
/// # Response Codes
///
/// - **307 Temporary Redirect**: `Location` is the decoded destination
/// - **404 Not Found**: the segment is tampered, truncated, forged, or not a click
///   payload; body is `Invalid tracking link`
///
/// The click is queued for recording before the redirect is returned. A full queue or a
/// failing event store never changes the response.
pub async fn click_handler(
    encoded: Result<Path<String>, PathRejection>,
    State(state): State<AppState>,
    headers: HeaderMap,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> Response {
    let Ok(Path(encoded)) = encoded else {
        return invalid_link();
    };
    let request_context = request_context_from_headers(&headers, addr, state.behind_proxy);

    let Some(target) = state.endpoint.handle_click(&encoded, request_context) else {
        return invalid_link();
    };

    // Targets are validated URLs, but control characters would still be rejected here.
    match HeaderValue::from_str(&target) {
        Ok(location) => (StatusCode::TEMPORARY_REDIRECT, [(header::LOCATION, location)]).into_response(),
        Err(_) => {
            tracing::warn!("Click target is not a valid Location header");
            invalid_link()
        }
    }
}

fn invalid_link() -> Response {
    (
        StatusCode::NOT_FOUND,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        INVALID_LINK,
    )
        .into_response()
}
