//! Live telemetry sources.
//!
//! Two interchangeable backends produce [`RawTelemetry`]: the Digital Factory
//! cloud API and the printers' own local cluster API. Which one is used is fixed
//! at startup from configuration; the orchestrator only sees [`TelemetrySource`].

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::config::LiveSourceConfig;
use crate::models::live::{LiveReason, RawJob, RawTelemetry};
use crate::services::clock::Clock;
use crate::services::cloud::CloudClient;
use crate::services::device::DirectDeviceSource;

/// A backend able to fetch live device/job state for a printer key.
#[async_trait]
pub trait TelemetrySource: Send + Sync {
    /// Short name for logs and health output.
    fn name(&self) -> &'static str;

    async fn fetch_telemetry(&self, printer_key: &str) -> Result<RawTelemetry, FetchError>;
}

/// Build the telemetry source selected by configuration.
pub fn build_source(
    config: LiveSourceConfig,
    clock: Arc<dyn Clock>,
) -> Result<Arc<dyn TelemetrySource>, FetchError> {
    match config {
        LiveSourceConfig::Cloud(cloud) => Ok(Arc::new(CloudClient::new(cloud, clock)?)),
        LiveSourceConfig::Device(device) => Ok(Arc::new(DirectDeviceSource::new(device)?)),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("no device address configured for printer key {0:?}")]
    NotConfigured(String),

    #[error("printer did not respond within {0:?}")]
    Timeout(Duration),

    #[error("printer unreachable: {0}")]
    Unreachable(#[source] reqwest::Error),

    #[error("no cloud cluster matches printer key {0:?}")]
    ClusterNotFound(String),

    #[error("{endpoint} returned HTTP {status}: {body}")]
    Upstream {
        endpoint: &'static str,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("cloud request failed: {0}")]
    Cloud(#[source] reqwest::Error),

    #[error("HTTP client setup failed: {0}")]
    Client(#[source] reqwest::Error),
}

impl FetchError {
    /// Client-facing reason for a failed live fetch.
    pub fn reason(&self) -> LiveReason {
        match self {
            Self::NotConfigured(_) => LiveReason::KeyNotConfigured,
            Self::Timeout(_) => LiveReason::Timeout,
            Self::Unreachable(_) => LiveReason::Unreachable,
            Self::ClusterNotFound(_) | Self::Upstream { .. } | Self::Cloud(_) | Self::Client(_) => {
                LiveReason::CloudError
            }
        }
    }
}

/// Print job object as it appears in both the cloud and local cluster APIs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireJob {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub time_elapsed: Option<f64>,
    #[serde(default)]
    pub time_total: Option<f64>,
}

impl From<WireJob> for RawJob {
    fn from(job: WireJob) -> Self {
        Self {
            name: job.name.unwrap_or_else(|| "Unknown job".to_string()),
            status: job.status.unwrap_or_else(|| "unknown".to_string()),
            time_elapsed: job.time_elapsed.unwrap_or(0.0),
            time_total: job.time_total.unwrap_or(0.0),
        }
    }
}

/// Pick the job to report: the one printing, else the first listed, else none.
pub fn select_active_job(jobs: Vec<WireJob>) -> Option<RawJob> {
    let index = jobs
        .iter()
        .position(|job| job.status.as_deref() == Some("printing"))
        .unwrap_or(0);
    jobs.into_iter().nth(index).map(RawJob::from)
}

/// Status reported when a payload carries none.
pub const DEFAULT_PROVIDER_STATUS: &str = "idle";
