//! In-process event store.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::domain::entities::{EmailStats, EventRecord, OpenOutcome};
use crate::domain::repositories::EventRepository;
use crate::error::RecorderError;

#[derive(Debug)]
struct EmailSlot {
    stats: EmailStats,
    events: Vec<EventRecord>,
}

/// Event store kept in memory.
///
/// Used when no database is configured and by tests. Each email owns a slot behind its
/// own mutex; the map is only touched to look the slot up, so unrelated emails never wait
/// on each other's read-modify-write. State is lost on restart.
#[derive(Default)]
pub struct MemoryEventRepository {
    emails: DashMap<String, Arc<Mutex<EmailSlot>>>,
}

impl MemoryEventRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, email_id: &str) -> Arc<Mutex<EmailSlot>> {
        if let Some(slot) = self.emails.get(email_id) {
            return slot.clone();
        }
        self.emails
            .entry(email_id.to_string())
            .or_insert_with(|| {
                Arc::new(Mutex::new(EmailSlot {
                    stats: EmailStats::new(email_id),
                    events: Vec::new(),
                }))
            })
            .clone()
    }

    fn existing_slot(&self, email_id: &str) -> Option<Arc<Mutex<EmailSlot>>> {
        self.emails.get(email_id).map(|slot| slot.clone())
    }
}

// A panic while holding the lock cannot leave a slot half-updated: every mutation
// below is a single assignment or push.
fn lock(slot: &Mutex<EmailSlot>) -> MutexGuard<'_, EmailSlot> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl EventRepository for MemoryEventRepository {
    async fn record_open(&self, record: EventRecord) -> Result<OpenOutcome, RecorderError> {
        let slot = self.slot(&record.email_id);
        let mut guard = lock(&slot);

        let outcome = guard.stats.open.apply_open(record.timestamp);
        guard.events.push(record);

        Ok(outcome)
    }

    async fn record_click(&self, record: EventRecord) -> Result<u64, RecorderError> {
        let slot = self.slot(&record.email_id);
        let mut guard = lock(&slot);

        guard.stats.clicks += 1;
        let clicks = guard.stats.clicks;
        guard.events.push(record);

        Ok(clicks)
    }

    async fn get_stats(&self, email_id: &str) -> Result<Option<EmailStats>, RecorderError> {
        Ok(self
            .existing_slot(email_id)
            .map(|slot| lock(&slot).stats.clone()))
    }

    async fn list_events(&self, email_id: &str) -> Result<Vec<EventRecord>, RecorderError> {
        Ok(self
            .existing_slot(email_id)
            .map(|slot| lock(&slot).events.clone())
            .unwrap_or_default())
    }

    async fn health_check(&self) -> bool {
        true
    }
}
