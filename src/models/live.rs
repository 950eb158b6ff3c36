use serde::{Serialize, Serializer};
use strum::{Display, IntoStaticStr};

use crate::models::printer::PrinterStatus;

/// Provider-native device state, as fetched from either telemetry source.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTelemetry {
    /// Status string in the provider's own vocabulary (`idle`, `printing`, ...).
    pub printer_status: String,
    pub job: Option<RawJob>,
}

/// Job descriptor as reported by the provider. Missing fields are defaulted upstream.
#[derive(Debug, Clone, PartialEq)]
pub struct RawJob {
    pub name: String,
    pub status: String,
    pub time_elapsed: f64,
    pub time_total: f64,
}

/// Normalized view of the active job.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobProgress {
    pub name: String,
    pub status: String,
    pub time_elapsed: u64,
    pub time_total: u64,
    /// Never negative.
    pub time_remaining: u64,
    /// 0–100; 0 when the total is unknown.
    pub percent_complete: u8,
}

/// Why live data could not be produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LiveReason {
    /// The printer has no external key, so there is nothing to poll.
    NoKey,
    /// No device address is mapped for the key.
    KeyNotConfigured,
    Unreachable,
    Timeout,
    CloudError,
    /// Part of the client vocabulary. Missing clusters are currently reported as
    /// `cloud_error`, matching what deployed dashboards expect.
    ClusterNotFound,
}

/// Result of a live status query. Cached per printer, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub enum LiveResult {
    Live {
        /// Raw provider status, reported as fetched.
        printer_status: String,
        canonical_status: PrinterStatus,
        job: Option<JobProgress>,
    },
    Unavailable {
        reason: LiveReason,
    },
}

impl LiveResult {
    pub fn unavailable(reason: LiveReason) -> Self {
        Self::Unavailable { reason }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, Self::Live { .. })
    }

    /// Short label used for logs and metric tags.
    pub fn outcome(&self) -> &'static str {
        match self {
            Self::Live { .. } => "live",
            Self::Unavailable { reason } => reason.into(),
        }
    }
}

/// Wire shape: `{live: true, printerStatus, canonicalStatus, job}` or `{live: false, reason}`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LiveResponse<'a> {
    live: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    printer_status: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    canonical_status: Option<PrinterStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<LiveReason>,
    // Live responses always carry `job`, possibly null.
    #[serde(skip_serializing_if = "Option::is_none")]
    job: Option<Option<&'a JobProgress>>,
}

impl Serialize for LiveResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let response = match self {
            Self::Live {
                printer_status,
                canonical_status,
                job,
            } => LiveResponse {
                live: true,
                printer_status: Some(printer_status.as_str()),
                canonical_status: Some(*canonical_status),
                reason: None,
                job: Some(job.as_ref()),
            },
            Self::Unavailable { reason } => LiveResponse {
                live: false,
                printer_status: None,
                canonical_status: None,
                reason: Some(*reason),
                job: None,
            },
        };
        response.serialize(serializer)
    }
}
