//! In-memory, per-client fixed-window rate limiter.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct RateLimiter {
    // client -> (requests in window, window start)
    inner: Arc<Mutex<HashMap<IpAddr, (u32, Instant)>>>,
    pub max_requests: u32,
    pub window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            max_requests,
            window,
        }
    }

    /// Live status endpoint: 20 requests per 30 seconds.
    pub fn for_live_status() -> Self {
        Self::new(20, Duration::from_secs(30))
    }

    /// Everything else: 120 requests per minute.
    pub fn general() -> Self {
        Self::new(120, Duration::from_secs(60))
    }

    /// Record a request from `client`; false if it is over the limit.
    pub async fn check_and_increment(&self, client: IpAddr) -> bool {
        self.check_and_increment_at(client, Instant::now()).await
    }

    async fn check_and_increment_at(&self, client: IpAddr, now: Instant) -> bool {
        let mut map = self.inner.lock().await;
        let entry = map.entry(client).or_insert((0, now));
        if now.duration_since(entry.1) >= self.window {
            *entry = (1, now);
            return true;
        }
        if entry.0 < self.max_requests {
            entry.0 += 1;
            true
        } else {
            false
        }
    }

    /// Drop clients whose window has long passed, bounding memory.
    pub async fn cleanup(&self) {
        let mut map = self.inner.lock().await;
        let now = Instant::now();
        map.retain(|_, &mut (_, start)| now.duration_since(start) < self.window * 2);
    }

    pub async fn tracked_clients(&self) -> usize {
        self.inner.lock().await.len()
    }
}
