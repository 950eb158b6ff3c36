//! Live status reconciliation.
//!
//! Given a printer id: serve from cache if fresh, otherwise fetch telemetry from
//! the configured source, normalize it, and write the canonical status back to
//! the store when it has drifted. Every outcome, good or bad, is cached for the
//! TTL so a struggling device is not polled on every page load.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Instant;

use crate::db::{PrinterStore, StoreError};
use crate::models::live::{JobProgress, LiveReason, LiveResult};
use crate::models::printer::{PrinterRecord, PrinterStatus, PrinterUpdate};
use crate::services::clock::Clock;
use crate::services::live_cache::LiveCache;
use crate::services::normalizer;
use crate::services::telemetry::TelemetrySource;

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("printer {0} not found")]
    NotFound(String),

    #[error("failed to load printer: {0}")]
    Store(#[source] StoreError),
}

impl From<StoreError> for ReconcileError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => Self::NotFound(id),
            other => Self::Store(other),
        }
    }
}

/// Orchestrates live status lookups for printers.
pub struct Reconciler {
    store: Arc<dyn PrinterStore>,
    source: Arc<dyn TelemetrySource>,
    cache: LiveCache,
    clock: Arc<dyn Clock>,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn PrinterStore>,
        source: Arc<dyn TelemetrySource>,
        cache: LiveCache,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            source,
            cache,
            clock,
        }
    }

    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    /// Live status for a printer.
    ///
    /// Fetch failures are reported as `Unavailable` results, never as errors;
    /// only an unknown printer or a failed record read is an error.
    pub async fn live_status(&self, printer_id: &str) -> Result<LiveResult, ReconcileError> {
        if let Some(cached) = self.cache.get(printer_id).await {
            tracing::debug!(printer_id, outcome = cached.outcome(), "Live status served from cache");
            metrics::counter!("live_cache_hits_total").increment(1);
            return Ok(cached);
        }

        let record = self.store.get(printer_id).await?;
        let result = self.reconcile(&record).await;

        metrics::counter!("live_status_requests_total", "outcome" => result.outcome())
            .increment(1);

        self.cache.insert(printer_id, result.clone()).await;
        Ok(result)
    }

    /// Forget the cached result for a printer, e.g. after a manual edit.
    pub async fn invalidate(&self, printer_id: &str) {
        self.cache.evict(printer_id).await;
    }

    /// Drop expired cache entries; returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        self.cache.purge_expired().await
    }

    async fn reconcile(&self, record: &PrinterRecord) -> LiveResult {
        let Some(printer_key) = record.printer_key.as_deref() else {
            return LiveResult::unavailable(LiveReason::NoKey);
        };

        let started = Instant::now();
        let fetched = self.source.fetch_telemetry(printer_key).await;
        metrics::histogram!("telemetry_fetch_seconds", "source" => self.source.name())
            .record(started.elapsed().as_secs_f64());

        let telemetry = match fetched {
            Ok(telemetry) => telemetry,
            Err(e) => {
                let reason = e.reason();
                tracing::warn!(
                    printer_id = %record.id,
                    printer_key,
                    source = self.source.name(),
                    reason = %reason,
                    error = %e,
                    "Live status fetch failed"
                );
                return LiveResult::unavailable(reason);
            }
        };

        let (canonical_status, job) = normalizer::normalize(&telemetry);

        if canonical_status != record.status {
            self.write_back(record, canonical_status, job.as_ref()).await;
        }

        LiveResult::Live {
            printer_status: telemetry.printer_status,
            canonical_status,
            job,
        }
    }

    /// Persist drifted status. Failures are logged; the live read still succeeds.
    async fn write_back(
        &self,
        record: &PrinterRecord,
        status: PrinterStatus,
        job: Option<&JobProgress>,
    ) {
        let now = self.clock.now();
        let estimated_finish = estimated_finish(now, status, job);
        let update = PrinterUpdate {
            status: Some(status),
            estimated_finish: Some(estimated_finish),
            ..PrinterUpdate::touch(now)
        };

        match self.store.update(&record.id, update).await {
            Ok(()) => {
                metrics::counter!("printer_writebacks_total").increment(1);
                tracing::info!(
                    printer_id = %record.id,
                    from = %record.status,
                    to = %status,
                    estimated_finish = ?estimated_finish,
                    "Synced printer status from live telemetry"
                );
            }
            Err(e) => {
                metrics::counter!("printer_writeback_failures_total").increment(1);
                tracing::error!(
                    printer_id = %record.id,
                    to = %status,
                    error = %e,
                    "Failed to write back live printer status"
                );
            }
        }
    }
}

/// Finish estimate for a status written back from telemetry.
///
/// Only an in-use printer with time left on its job gets one. A remaining time
/// too large to represent as a timestamp yields no estimate.
pub fn estimated_finish(
    now: DateTime<Utc>,
    status: PrinterStatus,
    job: Option<&JobProgress>,
) -> Option<DateTime<Utc>> {
    match (status, job) {
        (PrinterStatus::InUse, Some(job)) if job.time_remaining > 0 => {
            let remaining = i64::try_from(job.time_remaining).ok()?;
            now.checked_add_signed(chrono::Duration::try_seconds(remaining)?)
        }
        _ => None,
    }
}
