//! Maps provider telemetry onto the canonical status vocabulary.
//!
//! Both telemetry sources report the same Ultimaker status strings, so the
//! mapping is shared and does not depend on which source produced the data.

use crate::models::live::{JobProgress, RawJob, RawTelemetry};
use crate::models::printer::PrinterStatus;

/// Map a provider status string to the canonical vocabulary.
///
/// Matching is exact and case-sensitive.
pub fn canonical_status(provider_status: &str) -> PrinterStatus {
    match provider_status {
        "idle" => PrinterStatus::Available,
        "error" | "maintenance" => PrinterStatus::Maintenance,
        // Anything else (printing, paused, pre_print, unknown, ...) is treated as busy:
        // an unrecognised active state must never read as available.
        _ => PrinterStatus::InUse,
    }
}

/// Project a raw job onto progress figures.
///
/// A job with zero time remaining is still reported as is; deciding that it is
/// "probably finished" is left to the presentation layer.
pub fn job_progress(job: &RawJob) -> JobProgress {
    let elapsed = non_negative(job.time_elapsed);
    let total = non_negative(job.time_total);

    let percent_complete = if total > 0.0 {
        (elapsed / total * 100.0).round().clamp(0.0, 100.0) as u8
    } else {
        0
    };

    JobProgress {
        name: job.name.clone(),
        status: job.status.clone(),
        time_elapsed: elapsed.round() as u64,
        time_total: total.round() as u64,
        time_remaining: (total - elapsed).max(0.0).round() as u64,
        percent_complete,
    }
}

/// Canonical status plus optional job projection for a telemetry snapshot.
pub fn normalize(telemetry: &RawTelemetry) -> (PrinterStatus, Option<JobProgress>) {
    (
        canonical_status(&telemetry.printer_status),
        telemetry.job.as_ref().map(job_progress),
    )
}

// Negative or NaN timings count as zero.
fn non_negative(seconds: f64) -> f64 {
    if seconds.is_finite() && seconds > 0.0 {
        seconds
    } else {
        0.0
    }
}
