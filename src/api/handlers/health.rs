//! Handler for health check endpoint.

use axum::{Json, extract::State, http::StatusCode};

use crate::api::dto::health::{CheckStatus, HealthChecks, HealthResponse};
use crate::state::AppState;

/// Returns service health status with component checks.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response Codes
///
/// - **200 OK**: All components healthy
/// - **503 Service Unavailable**: One or more components degraded
///
/// # Components Checked
///
/// 1. **Event store**: Repository round trip
/// 2. **Event queue**: Checks if the channel is open and reports free slots
/// 3. **Webhook**: Reports whether forwarding is configured (never degrades)
///
/// # Response
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "checks": {
///     "event_store": { "status": "ok", "message": "Reachable" },
///     "event_queue": { "status": "ok", "message": "Capacity: 9998/10000" },
///     "webhook": { "status": "ok", "message": "Enabled" }
///   }
/// }
/// ```
pub async fn health_handler(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, (StatusCode, Json<HealthResponse>)> {
    let store_check = check_event_store(&state).await;

    let queue_check = check_event_queue(&state);

    let webhook_check = check_webhook(&state);

    let all_healthy = store_check.is_ok() && queue_check.is_ok() && webhook_check.is_ok();

    let response = HealthResponse {
        status: if all_healthy { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: HealthChecks {
            event_store: store_check,
            event_queue: queue_check,
            webhook: webhook_check,
        },
    };

    if all_healthy {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}

async fn check_event_store(state: &AppState) -> CheckStatus {
    if state.recorder.health_check().await {
        CheckStatus::ok("Reachable")
    } else {
        CheckStatus::error("Event store unreachable")
    }
}

/// Checks if the event queue is operational.
fn check_event_queue(state: &AppState) -> CheckStatus {
    if state.endpoint.is_queue_closed() {
        CheckStatus::error("Event queue is closed")
    } else {
        CheckStatus::ok(format!(
            "Capacity: {}/{}",
            state.endpoint.queue_capacity(),
            state.endpoint.queue_max_capacity()
        ))
    }
}

fn check_webhook(state: &AppState) -> CheckStatus {
    if state.webhook.is_enabled() {
        CheckStatus::ok("Enabled")
    } else {
        CheckStatus::ok("Disabled")
    }
}
