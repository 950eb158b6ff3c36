//! Live status orchestration against an in-memory store and scripted source.

mod fixtures;
mod helpers;

use chrono::Duration as ChronoDuration;
use std::time::Duration;

use makerspace_printers::db::PrinterStore;
use makerspace_printers::models::live::{LiveReason, LiveResult};
use makerspace_printers::models::printer::{PrinterStatus, PrinterUpdate};
use makerspace_printers::services::reconcile::ReconcileError;

use fixtures::{printer, printing_halfway, t0};
use helpers::{harness, harness_with, FakeSource, Scripted};

#[tokio::test]
async fn test_printing_device_marks_available_printer_in_use() {
    let h = harness(Scripted::Telemetry(printing_halfway()));
    h.store
        .insert(printer("p1", Some("ums5-1"), PrinterStatus::Available))
        .await;

    let result = h.reconciler.live_status("p1").await.unwrap();

    let LiveResult::Live {
        printer_status,
        canonical_status,
        job,
    } = result
    else {
        panic!("expected live result");
    };
    assert_eq!(printer_status, "printing");
    assert_eq!(canonical_status, PrinterStatus::InUse);
    let job = job.unwrap();
    assert_eq!(job.percent_complete, 50);
    assert_eq!(job.time_remaining, 600);

    let stored = h.store.get("p1").await.unwrap();
    assert_eq!(stored.status, PrinterStatus::InUse);
    assert_eq!(stored.estimated_finish, Some(t0() + ChronoDuration::seconds(600)));
    assert_eq!(stored.last_updated, t0());
    assert_eq!(h.store.update_count(), 1);
}

#[tokio::test]
async fn test_missing_key_skips_fetch() {
    let h = harness(Scripted::Telemetry(printing_halfway()));
    h.store
        .insert(printer("p2", None, PrinterStatus::Available))
        .await;

    let result = h.reconciler.live_status("p2").await.unwrap();

    assert_eq!(result, LiveResult::unavailable(LiveReason::NoKey));
    assert_eq!(h.source.calls(), 0);
    assert_eq!(h.store.update_count(), 0);
}

#[tokio::test]
async fn test_timeout_leaves_record_untouched() {
    let h = harness(Scripted::Timeout);
    h.store
        .insert(printer("p3", Some("ums5-3"), PrinterStatus::InUse))
        .await;

    let result = h.reconciler.live_status("p3").await.unwrap();

    assert_eq!(result, LiveResult::unavailable(LiveReason::Timeout));
    assert_eq!(h.store.update_count(), 0);
    assert_eq!(h.store.get("p3").await.unwrap().status, PrinterStatus::InUse);
}

#[tokio::test]
async fn test_unknown_cluster_reported_as_cloud_error() {
    let h = harness(Scripted::ClusterNotFound);
    h.store
        .insert(printer("p4", Some("ums5-9"), PrinterStatus::Available))
        .await;

    let result = h.reconciler.live_status("p4").await.unwrap();
    assert_eq!(result, LiveResult::unavailable(LiveReason::CloudError));
}

#[tokio::test]
async fn test_unmapped_key_reported() {
    let h = harness(Scripted::NotConfigured);
    h.store
        .insert(printer("p5", Some("ums5-5"), PrinterStatus::Available))
        .await;

    let result = h.reconciler.live_status("p5").await.unwrap();
    assert_eq!(result, LiveResult::unavailable(LiveReason::KeyNotConfigured));
}

#[tokio::test]
async fn test_unknown_printer_is_not_found() {
    let h = harness(Scripted::Telemetry(printing_halfway()));
    let err = h.reconciler.live_status("ghost").await.unwrap_err();
    assert!(matches!(err, ReconcileError::NotFound(id) if id == "ghost"));
    assert_eq!(h.source.calls(), 0);
}

#[tokio::test]
async fn test_matching_status_is_not_written() {
    let h = harness(Scripted::Telemetry(printing_halfway()));
    h.store
        .insert(printer("p1", Some("ums5-1"), PrinterStatus::InUse))
        .await;

    let result = h.reconciler.live_status("p1").await.unwrap();

    assert!(result.is_live());
    assert_eq!(h.store.update_count(), 0);
}

#[tokio::test]
async fn test_cache_serves_repeat_lookups_within_ttl() {
    let h = harness(Scripted::Telemetry(printing_halfway()));
    h.store
        .insert(printer("p1", Some("ums5-1"), PrinterStatus::Available))
        .await;

    let first = h.reconciler.live_status("p1").await.unwrap();
    h.clock.advance(Duration::from_secs(29));
    let second = h.reconciler.live_status("p1").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(h.source.calls(), 1);
    assert_eq!(h.store.update_count(), 1);

    h.clock.advance(Duration::from_secs(2));
    h.reconciler.live_status("p1").await.unwrap();
    assert_eq!(h.source.calls(), 2);
}

#[tokio::test]
async fn test_failures_are_cached_too() {
    let h = harness(Scripted::Timeout);
    h.store
        .insert(printer("p3", Some("ums5-3"), PrinterStatus::Available))
        .await;

    h.reconciler.live_status("p3").await.unwrap();
    h.source.set(Scripted::Telemetry(printing_halfway()));
    let second = h.reconciler.live_status("p3").await.unwrap();

    assert_eq!(second, LiveResult::unavailable(LiveReason::Timeout));
    assert_eq!(h.source.calls(), 1);
}

#[tokio::test]
async fn test_manual_edit_after_invalidate_is_not_masked() {
    let h = harness(Scripted::Telemetry(printing_halfway()));
    h.store
        .insert(printer("p1", Some("ums5-1"), PrinterStatus::Available))
        .await;
    h.reconciler.live_status("p1").await.unwrap();

    // Staff correct the record by hand; the cached reading must not survive it.
    let update = PrinterUpdate {
        status: Some(PrinterStatus::Maintenance),
        ..PrinterUpdate::touch(t0())
    };
    h.store.update("p1", update).await.unwrap();
    h.reconciler.invalidate("p1").await;
    h.source.set(Scripted::Telemetry(fixtures::idle()));

    let result = h.reconciler.live_status("p1").await.unwrap();

    assert_eq!(h.source.calls(), 2);
    let LiveResult::Live {
        canonical_status, ..
    } = result
    else {
        panic!("expected live result");
    };
    assert_eq!(canonical_status, PrinterStatus::Available);
    assert_eq!(
        h.store.get("p1").await.unwrap().status,
        PrinterStatus::Available
    );
}

#[tokio::test]
async fn test_failed_write_back_still_returns_live() {
    let h = harness(Scripted::Telemetry(printing_halfway()));
    h.store
        .insert(printer("p1", Some("ums5-1"), PrinterStatus::Available))
        .await;
    h.store.set_fail_updates(true);

    let result = h.reconciler.live_status("p1").await.unwrap();

    assert!(result.is_live());
    assert_eq!(
        h.store.get("p1").await.unwrap().status,
        PrinterStatus::Available
    );
}

#[tokio::test]
async fn test_idle_device_clears_finish_estimate() {
    let h = harness(Scripted::Telemetry(fixtures::idle()));
    let mut record = printer("p1", Some("ums5-1"), PrinterStatus::InUse);
    record.estimated_finish = Some(t0() + ChronoDuration::minutes(45));
    h.store.insert(record).await;
    h.clock.advance(Duration::from_secs(90));

    h.reconciler.live_status("p1").await.unwrap();

    let stored = h.store.get("p1").await.unwrap();
    assert_eq!(stored.status, PrinterStatus::Available);
    assert_eq!(stored.estimated_finish, None);
    assert_eq!(stored.last_updated, t0() + ChronoDuration::seconds(90));
}

#[tokio::test]
async fn test_printers_are_cached_independently() {
    let h = harness_with(FakeSource::slow(
        Scripted::Telemetry(printing_halfway()),
        Duration::from_millis(10),
    ));
    h.store
        .insert(printer("p1", Some("ums5-1"), PrinterStatus::InUse))
        .await;
    h.store
        .insert(printer("p2", Some("ums5-2"), PrinterStatus::InUse))
        .await;

    let (a, b) = tokio::join!(
        h.reconciler.live_status("p1"),
        h.reconciler.live_status("p2")
    );
    assert!(a.unwrap().is_live());
    assert!(b.unwrap().is_live());
    assert_eq!(h.source.calls(), 2);

    h.reconciler.live_status("p1").await.unwrap();
    h.reconciler.live_status("p2").await.unwrap();
    assert_eq!(h.source.calls(), 2);
}
