#![allow(dead_code)]

use async_trait::async_trait;
use axum::extract::ConnectInfo;
use axum::routing::get;
use axum::{Router, http::Request};
use email_tracker::api::handlers::health_handler;
use email_tracker::api::routes::tracking_routes;
use email_tracker::application::services::{EventRecorder, TrackingEndpoint, UrlCodec};
use email_tracker::domain::entities::{EmailStats, EventRecord, OpenOutcome};
use email_tracker::domain::repositories::EventRepository;
use email_tracker::domain::{EncryptionKey, Metadata, TrackingConfig, TrackingResult};
use email_tracker::error::RecorderError;
use email_tracker::infrastructure::persistence::MemoryEventRepository;
use email_tracker::infrastructure::webhook::{NullWebhook, WebhookSink};
use email_tracker::state::AppState;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc;
use tower::Layer;

pub const OPEN_BASE: &str = "https://t.example.com/track/open";
pub const CLICK_BASE: &str = "https://t.example.com/track/click";
pub const PEER_ADDR: &str = "127.0.0.1:12345";

pub fn plain_config() -> TrackingConfig {
    TrackingConfig::new(OPEN_BASE, CLICK_BASE)
}

pub fn encrypted_config() -> TrackingConfig {
    plain_config().with_encryption_key(EncryptionKey::from_bytes([42; 32]))
}

pub fn email(id: i64) -> Metadata {
    Metadata::new().with("email_id", id).with("campaign", "spring")
}

/// Everything a handler test needs: state for the router, the codec that built the
/// URLs, and the receiving end of the event queue.
pub struct TestContext {
    pub state: AppState,
    pub codec: UrlCodec,
    pub recorder: Arc<EventRecorder>,
    pub rx: mpsc::Receiver<TrackingResult>,
}

pub fn create_test_state(config: TrackingConfig) -> TestContext {
    create_test_state_with(config, Arc::new(MemoryEventRepository::new()), 100)
}

pub fn create_test_state_with(
    config: TrackingConfig,
    repository: Arc<dyn EventRepository>,
    queue_capacity: usize,
) -> TestContext {
    let codec = UrlCodec::new(Arc::new(config));
    let recorder = Arc::new(EventRecorder::new(repository, "email_id"));
    let webhook: Arc<dyn WebhookSink> = Arc::new(NullWebhook::new());
    let (tx, rx) = mpsc::channel(queue_capacity);

    let state = AppState::new(
        TrackingEndpoint::new(codec.clone(), tx),
        recorder.clone(),
        webhook,
        false,
    );

    TestContext {
        state,
        codec,
        recorder,
        rx,
    }
}

/// The production routes without path normalization, which axum-test cannot host.
pub fn test_router(state: AppState) -> Router {
    Router::new()
        .nest("/track", tracking_routes())
        .route("/health", get(health_handler))
        .layer(MockConnectInfoLayer::default())
        .with_state(state)
}

/// Event store that is always down.
#[derive(Default)]
pub struct FailingRepository {
    pub calls: AtomicUsize,
}

#[async_trait]
impl EventRepository for FailingRepository {
    async fn record_open(&self, _record: EventRecord) -> Result<OpenOutcome, RecorderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(RecorderError::Storage("connection refused".into()))
    }

    async fn record_click(&self, _record: EventRecord) -> Result<u64, RecorderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(RecorderError::Storage("connection refused".into()))
    }

    async fn get_stats(&self, _email_id: &str) -> Result<Option<EmailStats>, RecorderError> {
        Err(RecorderError::Storage("connection refused".into()))
    }

    async fn list_events(&self, _email_id: &str) -> Result<Vec<EventRecord>, RecorderError> {
        Err(RecorderError::Storage("connection refused".into()))
    }

    async fn health_check(&self) -> bool {
        false
    }
}

/// Path of a full tracking URL, for requests against the test server.
pub fn path_of(url: &str) -> &str {
    url.strip_prefix("https://t.example.com").unwrap()
}

/// Inserts a fixed peer address, standing in for `into_make_service_with_connect_info`.
#[derive(Clone)]
pub struct MockConnectInfoLayer {
    addr: SocketAddr,
}

impl MockConnectInfoLayer {
    pub fn new(addr: SocketAddr) -> Self {
        Self { addr }
    }
}

impl Default for MockConnectInfoLayer {
    fn default() -> Self {
        Self::new(PEER_ADDR.parse().unwrap())
    }
}

impl<S> Layer<S> for MockConnectInfoLayer {
    type Service = MockConnectInfoService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MockConnectInfoService {
            inner,
            addr: self.addr,
        }
    }
}

#[derive(Clone)]
pub struct MockConnectInfoService<S> {
    inner: S,
    addr: SocketAddr,
}

impl<S, B> tower::Service<Request<B>> for MockConnectInfoService<S>
where
    S: tower::Service<Request<B>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<B>) -> Self::Future {
        req.extensions_mut().insert(ConnectInfo(self.addr));
        self.inner.call(req)
    }
}
