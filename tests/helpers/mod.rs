//! Test helper utilities: scripted telemetry source, in-process servers, request plumbing
#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

use makerspace_printers::app_state::{AccessPolicy, AppState};
use makerspace_printers::db::MemoryPrinterStore;
use makerspace_printers::models::live::RawTelemetry;
use makerspace_printers::services::clock::ManualClock;
use makerspace_printers::services::live_cache::LiveCache;
use makerspace_printers::services::reconcile::Reconciler;
use makerspace_printers::services::telemetry::{FetchError, TelemetrySource};

use crate::fixtures;

/// What the scripted source answers with.
#[derive(Debug, Clone)]
pub enum Scripted {
    Telemetry(RawTelemetry),
    Timeout,
    NotConfigured,
    ClusterNotFound,
}

/// Telemetry source that replays a scripted outcome and counts fetches.
pub struct FakeSource {
    outcome: Mutex<Scripted>,
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl FakeSource {
    pub fn new(outcome: Scripted) -> Arc<Self> {
        Arc::new(Self {
            outcome: Mutex::new(outcome),
            calls: AtomicUsize::new(0),
            delay: None,
        })
    }

    pub fn slow(outcome: Scripted, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            outcome: Mutex::new(outcome),
            calls: AtomicUsize::new(0),
            delay: Some(delay),
        })
    }

    pub fn set(&self, outcome: Scripted) {
        *self.outcome.lock().unwrap() = outcome;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TelemetrySource for FakeSource {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn fetch_telemetry(&self, printer_key: &str) -> Result<RawTelemetry, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let outcome = self.outcome.lock().unwrap().clone();
        match outcome {
            Scripted::Telemetry(telemetry) => Ok(telemetry),
            Scripted::Timeout => Err(FetchError::Timeout(Duration::from_secs(5))),
            Scripted::NotConfigured => Err(FetchError::NotConfigured(printer_key.to_string())),
            Scripted::ClusterNotFound => Err(FetchError::ClusterNotFound(printer_key.to_string())),
        }
    }
}

/// Reconciler wired to in-memory collaborators.
pub struct Harness {
    pub store: MemoryPrinterStore,
    pub source: Arc<FakeSource>,
    pub clock: Arc<ManualClock>,
    pub reconciler: Reconciler,
}

pub fn harness(outcome: Scripted) -> Harness {
    harness_with(FakeSource::new(outcome))
}

pub fn harness_with(source: Arc<FakeSource>) -> Harness {
    let clock = Arc::new(ManualClock::new(fixtures::t0()));
    let store = MemoryPrinterStore::with_clock(clock.clone());
    let reconciler = Reconciler::new(
        Arc::new(store.clone()),
        source.clone(),
        LiveCache::new(clock.clone()),
        clock.clone(),
    );
    Harness {
        store,
        source,
        clock,
        reconciler,
    }
}

/// Full application state over in-memory collaborators.
pub struct TestApp {
    pub state: AppState,
    pub store: MemoryPrinterStore,
    pub source: Arc<FakeSource>,
    pub clock: Arc<ManualClock>,
}

pub fn test_app(outcome: Scripted, access: AccessPolicy) -> TestApp {
    let clock = Arc::new(ManualClock::new(fixtures::t0()));
    let store = MemoryPrinterStore::with_clock(clock.clone());
    let source = FakeSource::new(outcome);
    let state = AppState::new(
        Arc::new(store.clone()),
        source.clone(),
        clock.clone(),
        access,
    );
    TestApp {
        state,
        store,
        source,
        clock,
    }
}

pub fn admin_access(key: &str) -> AccessPolicy {
    AccessPolicy {
        admin_api_key: Some(key.to_string()),
        production: true,
    }
}

/// Run one request through the router and decode the JSON body (`Null` if empty).
pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn json_request(method: &str, uri: &str, api_key: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(key) = api_key {
        builder = builder.header("x-api-key", key);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// Serve `app` on an ephemeral loopback port.
pub async fn spawn_server(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// An address nothing is listening on.
pub async fn closed_port() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}
