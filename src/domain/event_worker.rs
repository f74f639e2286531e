use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Semaphore, mpsc};
use tokio_retry::RetryIf;
use tokio_retry::strategy::{ExponentialBackoff, jitter};

use crate::application::services::{EventRecorder, RecordOutcome};
use crate::domain::TrackingResult;
use crate::error::RecorderError;
use crate::infrastructure::webhook::WebhookSink;

/// Attempts per event, the first call included.
const RECORD_ATTEMPTS: usize = 3;

/// Worker tuning, taken from [`crate::config::Config`].
#[derive(Debug, Clone, Copy)]
pub struct WorkerOptions {
    pub concurrency: usize,
    pub recorder_timeout: Duration,
}

impl Default for WorkerOptions {
    fn default() -> Self {
        Self {
            concurrency: 4,
            recorder_timeout: Duration::from_millis(2000),
        }
    }
}

/// Consumes tracking results until every sender is dropped.
///
/// Each event is recorded and then forwarded to the webhook on its own task; at most
/// `options.concurrency` events are in flight. Failures are logged and counted, never
/// surfaced: by the time an event reaches this worker its HTTP response has already
/// been sent.
pub async fn run_event_worker(
    mut rx: mpsc::Receiver<TrackingResult>,
    recorder: Arc<EventRecorder>,
    webhook: Arc<dyn WebhookSink>,
    options: WorkerOptions,
) {
    let permits = Arc::new(Semaphore::new(options.concurrency.max(1)));

    while let Some(event) = rx.recv().await {
        let Ok(permit) = permits.clone().acquire_owned().await else {
            break;
        };

        let recorder = recorder.clone();
        let webhook = webhook.clone();
        tokio::spawn(async move {
            process_event(&event, &recorder, webhook.as_ref(), options.recorder_timeout).await;
            drop(permit);
        });
    }

    // Wait for in-flight events before returning.
    let _ = permits.acquire_many(options.concurrency.max(1) as u32).await;
    tracing::info!("Event worker stopped");
}

/// Records one event, then forwards it.
///
/// The webhook fires even when recording failed or was skipped; the two sinks are
/// independent.
pub async fn process_event(
    event: &TrackingResult,
    recorder: &EventRecorder,
    webhook: &dyn WebhookSink,
    recorder_timeout: Duration,
) {
    match record_with_retry(event, recorder, recorder_timeout).await {
        Ok(RecordOutcome::Opened(outcome)) if outcome.first_open => {
            tracing::info!(first_opened_at = %outcome.first_opened_at, "First open recorded");
        }
        Ok(RecordOutcome::Skipped) => {
            tracing::debug!(kind = %event.kind, "Event without email id, not recorded");
        }
        Ok(_) => {}
        Err(e) => {
            metrics::counter!("tracking_record_failures_total").increment(1);
            tracing::error!(kind = %event.kind, error = %e, "Failed to record tracking event");
        }
    }

    if let Err(e) = webhook.forward(event).await {
        metrics::counter!("tracking_webhook_failures_total").increment(1);
        tracing::warn!(kind = %event.kind, error = %e, "Webhook delivery failed");
    }
}

async fn record_with_retry(
    event: &TrackingResult,
    recorder: &EventRecorder,
    recorder_timeout: Duration,
) -> Result<RecordOutcome, RecorderError> {
    let strategy = ExponentialBackoff::from_millis(10)
        .factor(5)
        .max_delay(Duration::from_millis(500))
        .map(jitter)
        .take(RECORD_ATTEMPTS - 1);

    RetryIf::spawn(
        strategy,
        move || async move {
            match tokio::time::timeout(recorder_timeout, recorder.record(event)).await {
                Ok(result) => result,
                Err(_) => Err(RecorderError::Timeout(recorder_timeout.as_millis() as u64)),
            }
        },
        |e: &RecorderError| {
            let retry = e.is_transient();
            if retry {
                tracing::debug!(error = %e, "Retrying event recording");
            }
            retry
        },
    )
    .await
}
