use std::sync::Arc;

use crate::db::PrinterStore;
use crate::services::{
    clock::Clock, live_cache::LiveCache, rate_limit::RateLimiter, reconcile::Reconciler,
    telemetry::TelemetrySource,
};

/// Who may call mutating endpoints.
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    /// Expected `X-API-Key` value.
    pub admin_api_key: Option<String>,
    /// Without a key, production rejects mutations while development lets them through.
    pub production: bool,
}

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn PrinterStore>,
    pub reconciler: Arc<Reconciler>,
    pub clock: Arc<dyn Clock>,
    pub access: Arc<AccessPolicy>,
    pub live_limiter: RateLimiter,
    pub general_limiter: RateLimiter,
}

impl AppState {
    pub fn new(
        store: Arc<dyn PrinterStore>,
        source: Arc<dyn TelemetrySource>,
        clock: Arc<dyn Clock>,
        access: AccessPolicy,
    ) -> Self {
        let cache = LiveCache::new(clock.clone());
        let reconciler = Reconciler::new(store.clone(), source, cache, clock.clone());

        Self {
            store,
            reconciler: Arc::new(reconciler),
            clock,
            access: Arc::new(access),
            live_limiter: RateLimiter::for_live_status(),
            general_limiter: RateLimiter::general(),
        }
    }
}
