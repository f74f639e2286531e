//! HTTP server initialization and runtime setup.
//!
//! Handles event store selection, webhook setup, worker spawning, and Axum server lifecycle.

use crate::application::services::{EventRecorder, TrackingEndpoint, UrlCodec};
use crate::config::Config;
use crate::domain::event_worker::{WorkerOptions, run_event_worker};
use crate::domain::repositories::EventRepository;
use crate::infrastructure::persistence::{MemoryEventRepository, PgEventRepository};
use crate::infrastructure::webhook::{HttpWebhook, NullWebhook, WebhookSink};
use crate::routes::app_router;
use crate::state::AppState;

use anyhow::{Context, Result};
use axum::ServiceExt;
use axum::extract::Request;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// How long shutdown waits for queued events to be recorded and forwarded.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Runs the HTTP server with the given configuration.
///
/// Initializes:
/// - PostgreSQL connection pool and migrations (or the in-memory store)
/// - Webhook forwarder (or NullWebhook fallback)
/// - Background event worker
/// - Axum HTTP server with graceful shutdown on Ctrl+C / SIGTERM
///
/// # Errors
///
/// Returns an error if:
/// - Database connection or migration fails
/// - The webhook client cannot be built
/// - Server bind fails
/// - Server runtime error occurs
pub async fn run(config: Config) -> Result<()> {
    let repository = connect_event_store(&config).await?;

    let tracking = Arc::new(config.tracking_config());

    let webhook: Arc<dyn WebhookSink> = match &tracking.webhook {
        Some(webhook_config) => Arc::new(
            HttpWebhook::new(webhook_config).context("Failed to build webhook client")?,
        ),
        None => {
            tracing::info!("Webhook disabled (NullWebhook)");
            Arc::new(NullWebhook::new())
        }
    };

    let recorder = Arc::new(EventRecorder::new(repository, &tracking.email_id_key));

    let (event_tx, event_rx) = mpsc::channel(config.event_queue_capacity);

    let worker = tokio::spawn(run_event_worker(
        event_rx,
        recorder.clone(),
        webhook.clone(),
        WorkerOptions {
            concurrency: config.event_worker_concurrency,
            recorder_timeout: config.recorder_timeout(),
        },
    ));
    tracing::info!("Event worker started");

    let endpoint = TrackingEndpoint::new(UrlCodec::new(tracking), event_tx);
    let state = AppState::new(endpoint, recorder, webhook, config.behind_proxy);

    let app = app_router(state);

    let addr: SocketAddr = config.listen_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{addr}");

    axum::serve(
        listener,
        ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    // The router owned the last sender; the worker now drains what is queued.
    match tokio::time::timeout(DRAIN_TIMEOUT, worker).await {
        Ok(Ok(())) => tracing::info!("Event queue drained"),
        Ok(Err(e)) => tracing::error!("Event worker panicked: {}", e),
        Err(_) => tracing::warn!(
            "Event queue not drained within {}s, remaining events are lost",
            DRAIN_TIMEOUT.as_secs()
        ),
    }

    Ok(())
}

/// Selects PostgreSQL when a database is configured, the in-memory store otherwise.
async fn connect_event_store(config: &Config) -> Result<Arc<dyn EventRepository>> {
    let Some(database_url) = &config.database_url else {
        tracing::warn!("No database configured, tracking events are kept in memory");
        return Ok(Arc::new(MemoryEventRepository::new()));
    };

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_connect_timeout))
        .connect(database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Connected to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;

    Ok(Arc::new(PgEventRepository::new(Arc::new(pool))))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
