//! PostgreSQL implementation of the event repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use std::sync::Arc;

use crate::domain::entities::{EmailStats, EventRecord, OpenOutcome, OpenState};
use crate::domain::repositories::EventRepository;
use crate::domain::{RequestContext, TrackingKind};
use crate::error::RecorderError;

/// PostgreSQL repository for engagement state and the event log.
///
/// Every mutation runs in one transaction. Opens take a row lock on the email's state
/// row (`SELECT ... FOR UPDATE`), so concurrent opens of the same email serialize while
/// other emails proceed in parallel. Clicks use a single upsert that increments in place.
pub struct PgEventRepository {
    pool: Arc<PgPool>,
}

impl PgEventRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct EventRow {
    email_id: String,
    kind: String,
    occurred_at: DateTime<Utc>,
    target_url: Option<String>,
    user_agent: Option<String>,
    client_ip: Option<String>,
    referrer: Option<String>,
}

impl TryFrom<EventRow> for EventRecord {
    type Error = RecorderError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        let kind = match row.kind.as_str() {
            "open" => TrackingKind::Open,
            "click" => TrackingKind::Click,
            other => {
                return Err(RecorderError::InvalidEvent(format!("unknown event kind '{other}'")));
            }
        };

        Ok(EventRecord {
            email_id: row.email_id,
            kind,
            timestamp: row.occurred_at,
            target_url: row.target_url,
            request_context: RequestContext {
                user_agent: row.user_agent,
                client_ip: row.client_ip,
                referrer: row.referrer,
            },
        })
    }
}

async fn insert_event(conn: &mut PgConnection, record: &EventRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO tracking_events
            (email_id, kind, occurred_at, target_url, user_agent, client_ip, referrer)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(&record.email_id)
    .bind(record.kind.as_str())
    .bind(record.timestamp)
    .bind(&record.target_url)
    .bind(&record.request_context.user_agent)
    .bind(&record.request_context.client_ip)
    .bind(&record.request_context.referrer)
    .execute(conn)
    .await?;

    Ok(())
}

#[async_trait]
impl EventRepository for PgEventRepository {
    async fn record_open(&self, record: EventRecord) -> Result<OpenOutcome, RecorderError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO email_tracking_state (email_id) VALUES ($1) ON CONFLICT (email_id) DO NOTHING",
        )
        .bind(&record.email_id)
        .execute(&mut *tx)
        .await?;

        let (opened, first_opened_at): (bool, Option<DateTime<Utc>>) = sqlx::query_as(
            "SELECT opened, first_opened_at FROM email_tracking_state WHERE email_id = $1 FOR UPDATE",
        )
        .bind(&record.email_id)
        .fetch_one(&mut *tx)
        .await?;

        let mut state = OpenState {
            opened,
            first_opened_at,
        };
        let outcome = state.apply_open(record.timestamp);

        if state.first_opened_at != first_opened_at || state.opened != opened {
            sqlx::query(
                r#"
                UPDATE email_tracking_state
                SET opened = $2, first_opened_at = $3, updated_at = NOW()
                WHERE email_id = $1
                "#,
            )
            .bind(&record.email_id)
            .bind(state.opened)
            .bind(state.first_opened_at)
            .execute(&mut *tx)
            .await?;
        }

        insert_event(&mut tx, &record).await?;
        tx.commit()
            .await
            .map_err(|e| RecorderError::Unconfirmed(e.to_string()))?;

        Ok(outcome)
    }

    async fn record_click(&self, record: EventRecord) -> Result<u64, RecorderError> {
        if record.target_url.is_none() {
            return Err(RecorderError::InvalidEvent(
                "click record without target URL".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;

        let (clicks,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO email_tracking_state (email_id, clicks)
            VALUES ($1, 1)
            ON CONFLICT (email_id)
            DO UPDATE SET clicks = email_tracking_state.clicks + 1, updated_at = NOW()
            RETURNING clicks
            "#,
        )
        .bind(&record.email_id)
        .fetch_one(&mut *tx)
        .await?;

        insert_event(&mut tx, &record).await?;
        tx.commit()
            .await
            .map_err(|e| RecorderError::Unconfirmed(e.to_string()))?;

        Ok(clicks.max(0) as u64)
    }

    async fn get_stats(&self, email_id: &str) -> Result<Option<EmailStats>, RecorderError> {
        let row: Option<(String, bool, Option<DateTime<Utc>>, i64)> = sqlx::query_as(
            r#"
            SELECT email_id, opened, first_opened_at, clicks
            FROM email_tracking_state
            WHERE email_id = $1
            "#,
        )
        .bind(email_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(|(email_id, opened, first_opened_at, clicks)| EmailStats {
            email_id,
            open: OpenState {
                opened,
                first_opened_at,
            },
            clicks: clicks.max(0) as u64,
        }))
    }

    async fn list_events(&self, email_id: &str) -> Result<Vec<EventRecord>, RecorderError> {
        let rows: Vec<EventRow> = sqlx::query_as(
            r#"
            SELECT email_id, kind, occurred_at, target_url, user_agent, client_ip, referrer
            FROM tracking_events
            WHERE email_id = $1
            ORDER BY id
            "#,
        )
        .bind(email_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        rows.into_iter().map(EventRecord::try_from).collect()
    }

    async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1")
            .execute(self.pool.as_ref())
            .await
            .is_ok()
    }
}
