//! Direct polling of a printer's local cluster API.
//!
//! Unauthenticated; only reachable from the makerspace network. Addresses come
//! from configuration (printer key → host), never from the stored records.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::config::DeviceConfig;
use crate::models::live::RawTelemetry;
use crate::services::telemetry::{
    select_active_job, FetchError, TelemetrySource, WireJob, DEFAULT_PROVIDER_STATUS,
};

/// Deadline shared by both requests of one fetch.
pub const DEVICE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Default, Deserialize)]
struct WirePrinter {
    #[serde(default)]
    status: Option<String>,
}

/// HTTP client for the local `/cluster-api/v1` endpoints.
pub struct DeviceClient {
    http: Client,
    timeout: Duration,
}

impl DeviceClient {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let http = Client::builder().build().map_err(FetchError::Client)?;
        Ok(Self { http, timeout })
    }

    /// Fetch job and printer state from the device at `address` (`host` or `host:port`).
    ///
    /// Both requests run concurrently under one deadline, the only timeout on this
    /// path; if either fails or the deadline passes, the whole fetch fails and the
    /// other request is dropped.
    pub async fn fetch_telemetry(
        &self,
        printer_key: &str,
        address: &str,
    ) -> Result<RawTelemetry, FetchError> {
        let base = format!("http://{address}/cluster-api/v1");
        let jobs_url = format!("{base}/print_jobs");
        let printers_url = format!("{base}/printers");

        let both = async {
            tokio::try_join!(
                self.get_json::<Vec<WireJob>>(&jobs_url),
                self.get_json::<Vec<WirePrinter>>(&printers_url),
            )
        };

        let (jobs, printers) = match tokio::time::timeout(self.timeout, both).await {
            Ok(Ok(responses)) => responses,
            Ok(Err(err)) => {
                tracing::debug!(printer_key, address, error = %err, "Device request failed");
                return Err(FetchError::Unreachable(err));
            }
            Err(_) => return Err(FetchError::Timeout(self.timeout)),
        };

        let printer_status = printers
            .into_iter()
            .next()
            .and_then(|printer| printer.status)
            .unwrap_or_else(|| DEFAULT_PROVIDER_STATUS.to_string());

        Ok(RawTelemetry {
            printer_status,
            job: select_active_job(jobs),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, reqwest::Error> {
        self.http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json::<T>()
            .await
    }
}

/// Telemetry source that resolves printer keys to device addresses, then polls
/// the device directly.
pub struct DirectDeviceSource {
    client: DeviceClient,
    addresses: HashMap<String, String>,
}

impl DirectDeviceSource {
    pub fn new(config: DeviceConfig) -> Result<Self, FetchError> {
        Ok(Self {
            client: DeviceClient::new(config.timeout)?,
            addresses: config.addresses,
        })
    }

    pub fn address_for(&self, printer_key: &str) -> Option<&str> {
        self.addresses.get(printer_key).map(String::as_str)
    }
}

#[async_trait]
impl TelemetrySource for DirectDeviceSource {
    fn name(&self) -> &'static str {
        "device"
    }

    async fn fetch_telemetry(&self, printer_key: &str) -> Result<RawTelemetry, FetchError> {
        let address = self
            .address_for(printer_key)
            .ok_or_else(|| FetchError::NotConfigured(printer_key.to_string()))?;
        self.client.fetch_telemetry(printer_key, address).await
    }
}
