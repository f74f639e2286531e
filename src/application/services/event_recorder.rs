//! Event recording service.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::domain::entities::{EmailStats, EventRecord, OpenOutcome};
use crate::domain::repositories::EventRepository;
use crate::domain::{RequestContext, TrackingKind, TrackingResult};
use crate::error::RecorderError;

/// What [`EventRecorder::record`] did with a tracking result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Opened(OpenOutcome),
    Clicked { clicks: u64 },
    /// The metadata carried no email id; nothing was stored.
    Skipped,
}

/// Applies decoded tracking results to per-email engagement state.
///
/// The recorder resolves the email from the metadata entry named by `email_id_key`
/// and delegates the atomic update to the repository. Opens are idempotent per email;
/// every click is counted.
pub struct EventRecorder {
    repository: Arc<dyn EventRepository>,
    email_id_key: String,
}

impl EventRecorder {
    pub fn new(repository: Arc<dyn EventRepository>, email_id_key: impl Into<String>) -> Self {
        Self {
            repository,
            email_id_key: email_id_key.into(),
        }
    }

    /// Records a decoded fetch.
    ///
    /// # Errors
    ///
    /// Returns [`RecorderError::InvalidEvent`] for a click without a target (never produced
    /// by the codec) and propagates storage errors.
    pub async fn record(&self, result: &TrackingResult) -> Result<RecordOutcome, RecorderError> {
        let Some(email_id) = result.metadata.identifier(&self.email_id_key) else {
            return Ok(RecordOutcome::Skipped);
        };

        match result.kind {
            TrackingKind::Open => self
                .record_open(&email_id, result.timestamp, result.request_context.clone())
                .await
                .map(RecordOutcome::Opened),
            TrackingKind::Click => {
                let target_url = result.target_url.as_deref().ok_or_else(|| {
                    RecorderError::InvalidEvent("click result without target URL".to_string())
                })?;
                self.record_click(
                    &email_id,
                    result.timestamp,
                    target_url,
                    result.request_context.clone(),
                )
                .await
                .map(|clicks| RecordOutcome::Clicked { clicks })
            }
        }
    }

    /// Marks the email opened and appends an open event.
    ///
    /// Exactly one call per email returns `first_open == true`.
    pub async fn record_open(
        &self,
        email_id: &str,
        at: DateTime<Utc>,
        request_context: RequestContext,
    ) -> Result<OpenOutcome, RecorderError> {
        let outcome = self
            .repository
            .record_open(EventRecord::open(email_id, at, request_context))
            .await?;

        metrics::counter!("tracking_opens_total").increment(1);
        if outcome.first_open {
            tracing::debug!(email_id, "Email opened for the first time");
        }

        Ok(outcome)
    }

    /// Increments the click counter and appends a click event.
    ///
    /// Returns the counter value after the increment.
    pub async fn record_click(
        &self,
        email_id: &str,
        at: DateTime<Utc>,
        target_url: &str,
        request_context: RequestContext,
    ) -> Result<u64, RecorderError> {
        let clicks = self
            .repository
            .record_click(EventRecord::click(email_id, at, target_url, request_context))
            .await?;

        metrics::counter!("tracking_clicks_total").increment(1);
        tracing::debug!(email_id, clicks, "Click recorded");

        Ok(clicks)
    }

    pub async fn stats(&self, email_id: &str) -> Result<Option<EmailStats>, RecorderError> {
        self.repository.get_stats(email_id).await
    }

    pub async fn events(&self, email_id: &str) -> Result<Vec<EventRecord>, RecorderError> {
        self.repository.list_events(email_id).await
    }

    /// Reports whether the underlying store is reachable.
    pub async fn health_check(&self) -> bool {
        self.repository.health_check().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repositories::MockEventRepository;
    use crate::domain::{Metadata, TrackingPayload};
    use crate::infrastructure::persistence::MemoryEventRepository;
    use chrono::Duration;

    fn result(payload: TrackingPayload) -> TrackingResult {
        TrackingResult::new(payload, RequestContext::default(), Utc::now())
    }

    #[tokio::test]
    async fn test_record_routes_open_by_email_id() {
        let mut mock = MockEventRepository::new();
        mock.expect_record_open()
            .withf(|record| record.email_id == "42" && record.kind == TrackingKind::Open)
            .times(1)
            .returning(|record| {
                Ok(OpenOutcome {
                    first_open: true,
                    first_opened_at: record.timestamp,
                })
            });
        let recorder = EventRecorder::new(Arc::new(mock), "email_id");

        let outcome = recorder
            .record(&result(TrackingPayload::open(Metadata::new().with("email_id", 42))))
            .await
            .unwrap();

        assert!(matches!(outcome, RecordOutcome::Opened(o) if o.first_open));
    }

    #[tokio::test]
    async fn test_record_routes_click_with_target() {
        let mut mock = MockEventRepository::new();
        mock.expect_record_click()
            .withf(|record| {
                record.email_id == "e-9" && record.target_url.as_deref() == Some("https://example.com/")
            })
            .times(1)
            .returning(|_| Ok(3));
        let recorder = EventRecorder::new(Arc::new(mock), "email_id");

        let outcome = recorder
            .record(&result(TrackingPayload::click(
                "https://example.com/",
                Metadata::new().with("email_id", "e-9"),
            )))
            .await
            .unwrap();

        assert_eq!(outcome, RecordOutcome::Clicked { clicks: 3 });
    }

    #[tokio::test]
    async fn test_record_without_email_id_is_skipped() {
        let mock = MockEventRepository::new();
        let recorder = EventRecorder::new(Arc::new(mock), "email_id");

        let outcome = recorder
            .record(&result(TrackingPayload::open(Metadata::new().with("campaign", 1))))
            .await
            .unwrap();

        assert_eq!(outcome, RecordOutcome::Skipped);
    }

    #[tokio::test]
    async fn test_custom_email_id_key() {
        let mut mock = MockEventRepository::new();
        mock.expect_record_open()
            .withf(|record| record.email_id == "m-1")
            .returning(|record| {
                Ok(OpenOutcome {
                    first_open: false,
                    first_opened_at: record.timestamp,
                })
            });
        let recorder = EventRecorder::new(Arc::new(mock), "message_id");

        let outcome = recorder
            .record(&result(TrackingPayload::open(
                Metadata::new().with("message_id", "m-1").with("email_id", "ignored"),
            )))
            .await;

        assert!(outcome.is_ok());
    }

    #[tokio::test]
    async fn test_storage_errors_propagate() {
        let mut mock = MockEventRepository::new();
        mock.expect_record_click()
            .returning(|_| Err(RecorderError::Storage("pool timed out".into())));
        let recorder = EventRecorder::new(Arc::new(mock), "email_id");

        let err = recorder
            .record_click("1", Utc::now(), "https://example.com", RequestContext::default())
            .await
            .unwrap_err();

        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_stats_reads_through() {
        let mut mock = MockEventRepository::new();
        mock.expect_get_stats()
            .withf(|id| id == "7")
            .returning(|id| Ok(Some(EmailStats::new(id))));
        let recorder = EventRecorder::new(Arc::new(mock), "email_id");

        let stats = recorder.stats("7").await.unwrap().unwrap();

        assert_eq!(stats.email_id, "7");
        assert_eq!(stats.clicks, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_opens_have_one_winner_and_earliest_timestamp() {
        let recorder = Arc::new(EventRecorder::new(
            Arc::new(MemoryEventRepository::new()),
            "email_id",
        ));
        let base = Utc::now();

        let handles: Vec<_> = (0..32)
            .map(|i| {
                let recorder = recorder.clone();
                let at = base + Duration::milliseconds(31 - i);
                tokio::spawn(async move {
                    recorder
                        .record_open("same", at, RequestContext::default())
                        .await
                        .unwrap()
                })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap().first_open {
                winners += 1;
            }
        }

        let stats = recorder.stats("same").await.unwrap().unwrap();
        assert_eq!(winners, 1);
        assert!(stats.open.opened);
        assert_eq!(stats.open.first_opened_at, Some(base));
        assert_eq!(recorder.events("same").await.unwrap().len(), 32);
    }

    #[tokio::test]
    async fn test_sequential_clicks_are_all_counted() {
        let recorder = EventRecorder::new(Arc::new(MemoryEventRepository::new()), "email_id");

        for _ in 0..25 {
            recorder
                .record_click("c", Utc::now(), "https://example.com", RequestContext::default())
                .await
                .unwrap();
        }

        assert_eq!(recorder.stats("c").await.unwrap().unwrap().clicks, 25);
    }
}
