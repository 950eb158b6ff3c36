//! Ultimaker Digital Factory cloud client.
//!
//! The printer key matches a cluster `name` or `host_name` in the account
//! (e.g. `ums5-1`). The API offers no single-cluster lookup, so every fetch
//! lists all clusters and scans for the key.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::config::CloudConfig;
use crate::models::live::RawTelemetry;
use crate::services::clock::Clock;
use crate::services::telemetry::{
    select_active_job, FetchError, TelemetrySource, WireJob, DEFAULT_PROVIDER_STATUS,
};
use crate::services::token_cache::{IssuedToken, TokenCache};

const TOKEN_PATH: &str = "/oauth/v1/token";
const CLUSTERS_PATH: &str = "/connect/v1/clusters";
const TOKEN_SCOPE: &str = "um.df.organization.printers.read";

/// Client for the Digital Factory cluster listing, authenticated with a
/// client-credentials OAuth token shared by all requests.
pub struct CloudClient {
    http: Client,
    base_url: String,
    client_id: String,
    client_secret: String,
    timeout: Duration,
    tokens: TokenCache,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// The listing endpoint has returned a bare array as well as wrapped forms.
#[derive(Deserialize)]
#[serde(untagged)]
enum ClusterPayload {
    List(Vec<Cluster>),
    Wrapped {
        #[serde(default)]
        data: Option<Vec<Cluster>>,
        #[serde(default)]
        clusters: Option<Vec<Cluster>>,
    },
}

impl ClusterPayload {
    fn into_clusters(self) -> Vec<Cluster> {
        match self {
            Self::List(clusters) => clusters,
            Self::Wrapped { data, clusters } => data.or(clusters).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct Cluster {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    host_name: Option<String>,
    #[serde(default)]
    printer_status: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    print_jobs: Option<Vec<WireJob>>,
    #[serde(default)]
    active_print_jobs: Option<Vec<WireJob>>,
}

impl Cluster {
    fn matches(&self, printer_key: &str) -> bool {
        self.name.as_deref() == Some(printer_key) || self.host_name.as_deref() == Some(printer_key)
    }

    fn into_telemetry(self) -> RawTelemetry {
        let printer_status = self
            .printer_status
            .or(self.status)
            .unwrap_or_else(|| DEFAULT_PROVIDER_STATUS.to_string());
        let jobs = self
            .print_jobs
            .or(self.active_print_jobs)
            .unwrap_or_default();

        RawTelemetry {
            printer_status,
            job: select_active_job(jobs),
        }
    }
}

impl CloudClient {
    pub fn new(config: CloudConfig, clock: Arc<dyn Clock>) -> Result<Self, FetchError> {
        let http = Client::builder().build().map_err(FetchError::Client)?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client_id: config.client_id,
            client_secret: config.client_secret,
            timeout: config.timeout,
            tokens: TokenCache::new(clock),
        })
    }

    /// Fetch the device and job state of the cluster matching `printer_key`.
    pub async fn fetch_cluster_status(&self, printer_key: &str) -> Result<RawTelemetry, FetchError> {
        let token = self
            .tokens
            .get_or_refresh(|| self.request_token())
            .await?;

        let response = self
            .http
            .get(format!("{}{}", self.base_url, CLUSTERS_PATH))
            .bearer_auth(&token)
            .send()
            .await
            .map_err(FetchError::Cloud)?;

        if !response.status().is_success() {
            let status = response.status();
            if status == reqwest::StatusCode::UNAUTHORIZED {
                // Revoked early; make the next request fetch a new one.
                self.tokens.clear().await;
            }
            return Err(FetchError::Upstream {
                endpoint: "cluster listing",
                status,
                body: response.text().await.unwrap_or_default(),
            });
        }

        let payload: ClusterPayload = response
            .json()
            .await
            .map_err(FetchError::Cloud)?;

        payload
            .into_clusters()
            .into_iter()
            .find(|cluster| cluster.matches(printer_key))
            .map(Cluster::into_telemetry)
            .ok_or_else(|| FetchError::ClusterNotFound(printer_key.to_string()))
    }

    async fn request_token(&self) -> Result<IssuedToken, FetchError> {
        tracing::debug!("Requesting Digital Factory access token");

        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", TOKEN_SCOPE),
        ];

        let response = self
            .http
            .post(format!("{}{}", self.base_url, TOKEN_PATH))
            .form(&form)
            .send()
            .await
            .map_err(FetchError::Cloud)?;

        if !response.status().is_success() {
            return Err(FetchError::Upstream {
                endpoint: "token",
                status: response.status(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(FetchError::Cloud)?;

        Ok(IssuedToken {
            access_token: token.access_token,
            expires_in: token.expires_in.map(Duration::from_secs),
        })
    }
}

#[async_trait]
impl TelemetrySource for CloudClient {
    fn name(&self) -> &'static str {
        "cloud"
    }

    /// Token exchange and cluster listing share one deadline.
    async fn fetch_telemetry(&self, printer_key: &str) -> Result<RawTelemetry, FetchError> {
        tokio::time::timeout(self.timeout, self.fetch_cluster_status(printer_key))
            .await
            .map_err(|_| FetchError::Timeout(self.timeout))?
    }
}
