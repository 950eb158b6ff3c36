use axum::http::{HeaderValue, Method};
use axum::{routing::get, Router};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use makerspace_printers::{
    app_state::{AccessPolicy, AppState},
    config::AppConfig,
    db::{self, MemoryPrinterStore, PgPrinterStore, PrinterStore},
    routes,
    services::{
        clock::{Clock, SystemClock},
        telemetry::build_source,
    },
};

const CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!(env = %config.app_env, "Initializing makerspace printer service");

    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);

    metrics::describe_counter!(
        "live_status_requests_total",
        "Live status lookups by outcome (live or unavailable reason)"
    );
    metrics::describe_counter!(
        "live_cache_hits_total",
        "Live status lookups answered from the cache"
    );
    metrics::describe_histogram!(
        "telemetry_fetch_seconds",
        "Time to fetch telemetry from the live source"
    );
    metrics::describe_counter!(
        "printer_writebacks_total",
        "Canonical status changes written back to the store"
    );
    metrics::describe_counter!(
        "printer_writeback_failures_total",
        "Write-backs that failed and were skipped"
    );

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let store: Arc<dyn PrinterStore> = match config.database_url.as_deref() {
        Some(url) => {
            tracing::info!("Connecting to PostgreSQL database");
            let pool = db::init_pool(url)
                .await
                .expect("Failed to connect to database");

            tracing::info!("Running database migrations");
            db::run_migrations(&pool)
                .await
                .expect("Failed to run database migrations");

            Arc::new(PgPrinterStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; printers are kept in memory and lost on restart");
            Arc::new(MemoryPrinterStore::with_clock(clock.clone()))
        }
    };

    let source =
        build_source(config.live_source(), clock.clone()).expect("Failed to build live source");
    tracing::info!(source = source.name(), "Live status source selected");

    if config.admin_api_key.is_none() {
        if config.is_production() {
            tracing::error!("ADMIN_API_KEY not set; mutating endpoints will be refused");
        } else {
            tracing::warn!("ADMIN_API_KEY not set; mutating endpoints are open");
        }
    }

    let access = AccessPolicy {
        admin_api_key: config.admin_api_key.clone(),
        production: config.is_production(),
    };
    let state = AppState::new(store, source, clock, access);

    // Bound the memory held by rate limit windows and stale live results.
    let janitor = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            janitor.live_limiter.cleanup().await;
            janitor.general_limiter.cleanup().await;
            let purged = janitor.reconciler.purge_expired().await;
            tracing::debug!(purged, "Expired live results purged");
        }
    });

    let origin = config
        .frontend_url
        .parse::<HeaderValue>()
        .expect("FRONTEND_URL is not a valid origin");
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::HeaderName::from_static(routes::guard::API_KEY_HEADER),
        ]);

    let app = Router::new()
        .merge(routes::router(state))
        // Prometheus metrics endpoint (separate state)
        .route(
            "/metrics",
            get(routes::metrics::prometheus_metrics).with_state(prometheus_handle),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(64 * 1024));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Server error");
}
