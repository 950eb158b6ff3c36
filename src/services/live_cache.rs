//! Short-lived in-memory cache of live status results.
//!
//! Entries are keyed by printer id, independent of which telemetry source
//! produced them. Nothing here is persisted.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::models::live::LiveResult;
use crate::services::clock::Clock;

/// How long a live result is served from cache.
pub const LIVE_TTL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
struct Entry {
    result: LiveResult,
    expires_at: DateTime<Utc>,
}

/// Per-printer cache of [`LiveResult`]s with a fixed TTL.
#[derive(Clone)]
pub struct LiveCache {
    inner: Arc<RwLock<HashMap<String, Entry>>>,
    clock: Arc<dyn Clock>,
    ttl: chrono::Duration,
}

impl LiveCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_ttl(clock, LIVE_TTL)
    }

    pub fn with_ttl(clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            clock,
            ttl: chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::zero()),
        }
    }

    /// Fresh cached result for a printer, if any.
    pub async fn get(&self, printer_id: &str) -> Option<LiveResult> {
        let map = self.inner.read().await;
        map.get(printer_id)
            .filter(|entry| self.clock.now() < entry.expires_at)
            .map(|entry| entry.result.clone())
    }

    /// Store a result, replacing whatever was cached for the printer.
    pub async fn insert(&self, printer_id: &str, result: LiveResult) {
        let expires_at = self.clock.now() + self.ttl;
        let mut map = self.inner.write().await;
        map.insert(printer_id.to_string(), Entry { result, expires_at });
    }

    /// Drop a printer's entry so the next lookup misses.
    pub async fn evict(&self, printer_id: &str) {
        let mut map = self.inner.write().await;
        map.remove(printer_id);
    }

    /// Remove expired entries.
    pub async fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut map = self.inner.write().await;
        let before = map.len();
        map.retain(|_, entry| now < entry.expires_at);
        before - map.len()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}
