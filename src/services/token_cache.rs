use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::services::clock::Clock;

/// Tokens are refreshed this long before they actually expire.
pub const REFRESH_MARGIN: Duration = Duration::from_secs(30);

/// Lifetime assumed when the token endpoint omits `expires_in`.
pub const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(3600);

/// A bearer token as issued by the token endpoint.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub access_token: String,
    pub expires_in: Option<Duration>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

/// Single-slot cache for the process-wide OAuth credential.
///
/// The slot lock is held across a refresh, so concurrent callers that find the
/// token stale wait for the one exchange in flight instead of starting their own.
pub struct TokenCache {
    slot: Mutex<Option<CachedToken>>,
    clock: Arc<dyn Clock>,
    margin: chrono::Duration,
}

impl TokenCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            slot: Mutex::new(None),
            clock,
            margin: chrono::Duration::from_std(REFRESH_MARGIN)
                .unwrap_or_else(|_| chrono::Duration::zero()),
        }
    }

    /// Return the cached token, or run `refresh` and cache what it returns.
    ///
    /// A failed refresh leaves the slot as it was.
    pub async fn get_or_refresh<F, Fut, E>(&self, refresh: F) -> Result<String, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<IssuedToken, E>>,
    {
        let mut slot = self.slot.lock().await;

        if let Some(cached) = slot.as_ref() {
            if self.clock.now() < cached.expires_at - self.margin {
                return Ok(cached.access_token.clone());
            }
        }

        let issued = refresh().await?;
        let expires_at = expiry(self.clock.now(), issued.expires_in);

        tracing::debug!(expires_at = %expires_at, "Refreshed cloud access token");

        *slot = Some(CachedToken {
            access_token: issued.access_token.clone(),
            expires_at,
        });
        Ok(issued.access_token)
    }

    /// Drop the cached token so the next call refreshes.
    pub async fn clear(&self) {
        *self.slot.lock().await = None;
    }
}

/// Absolute expiry for a token issued at `now`. Missing or unrepresentable
/// lifetimes fall back to [`DEFAULT_TOKEN_LIFETIME`].
fn expiry(now: DateTime<Utc>, expires_in: Option<Duration>) -> DateTime<Utc> {
    let after = |lifetime: Duration| {
        chrono::Duration::from_std(lifetime)
            .ok()
            .and_then(|delta| now.checked_add_signed(delta))
    };
    expires_in
        .and_then(&after)
        .or_else(|| after(DEFAULT_TOKEN_LIFETIME))
        .unwrap_or(now)
}
