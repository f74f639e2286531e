//! Repository trait for engagement state and the event log.

use async_trait::async_trait;

use crate::domain::entities::{EmailStats, EventRecord, OpenOutcome};
use crate::error::RecorderError;

/// Storage contract for the event recorder.
///
/// Implementations own the atomicity guarantee: for a single `email_id`, the open
/// transition must be linearizable and click increments must never be lost. Operations
/// on different emails must not contend on a shared lock.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgEventRepository`] - PostgreSQL, row locks
/// - [`crate::infrastructure::persistence::MemoryEventRepository`] - in-process, per-email mutex
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Applies an open to the email's [`crate::domain::entities::OpenState`] and appends
    /// `record`, in a single atomic step. The email and the open time come from the record.
    ///
    /// # Errors
    ///
    /// Returns [`RecorderError::Storage`] on storage failures; nothing is written then.
    async fn record_open(&self, record: EventRecord) -> Result<OpenOutcome, RecorderError>;

    /// Increments the email's click counter and appends one [`EventRecord`].
    ///
    /// Returns the counter value after the increment.
    ///
    /// # Errors
    ///
    /// Returns [`RecorderError::Storage`] on storage failures.
    async fn record_click(&self, record: EventRecord) -> Result<u64, RecorderError>;

    /// Current state of one email, `None` if nothing was recorded for it.
    async fn get_stats(&self, email_id: &str) -> Result<Option<EmailStats>, RecorderError>;

    /// Event log of one email, oldest first.
    async fn list_events(&self, email_id: &str) -> Result<Vec<EventRecord>, RecorderError>;

    /// Checks if the store is reachable.
    async fn health_check(&self) -> bool;
}
