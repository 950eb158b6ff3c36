use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::services::device::DEVICE_TIMEOUT;

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:3001").
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// PostgreSQL connection string. Without it printers are kept in memory.
    #[serde(default)]
    pub database_url: Option<String>,

    /// Digital Factory OAuth client ID
    #[serde(default)]
    pub ultimaker_client_id: Option<String>,

    /// Digital Factory OAuth client secret
    #[serde(default)]
    pub ultimaker_client_secret: Option<String>,

    /// Digital Factory API base URL
    #[serde(default = "default_ultimaker_base_url")]
    pub ultimaker_base_url: String,

    /// Total request deadline for cloud calls, in seconds
    #[serde(default = "default_cloud_timeout_secs")]
    pub cloud_timeout_secs: u64,

    /// Shared deadline for one direct device poll, in milliseconds
    #[serde(default = "default_device_timeout_ms")]
    pub device_timeout_ms: u64,

    /// JSON object mapping printer keys to device hosts, e.g. `{"ums5-1":"10.0.4.21"}`
    #[serde(default)]
    pub printer_ips: Option<String>,

    /// Key required in `X-API-Key` for mutating requests
    #[serde(default)]
    pub admin_api_key: Option<String>,

    /// Origin allowed by CORS
    #[serde(default = "default_frontend_url")]
    pub frontend_url: String,

    /// Deployment environment; `production` refuses mutations when no admin key is set
    #[serde(default = "default_app_env")]
    pub app_env: String,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3001".to_string()
}

fn default_ultimaker_base_url() -> String {
    "https://api.ultimaker.com".to_string()
}

fn default_cloud_timeout_secs() -> u64 {
    10
}

fn default_device_timeout_ms() -> u64 {
    DEVICE_TIMEOUT.as_millis() as u64
}

fn default_frontend_url() -> String {
    "http://localhost:5173".to_string()
}

fn default_app_env() -> String {
    "development".to_string()
}

/// Where live status comes from. Chosen once at startup.
#[derive(Debug, Clone)]
pub enum LiveSourceConfig {
    Cloud(CloudConfig),
    Device(DeviceConfig),
}

#[derive(Debug, Clone)]
pub struct CloudConfig {
    pub client_id: String,
    pub client_secret: String,
    pub base_url: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct DeviceConfig {
    pub addresses: HashMap<String, String>,
    pub timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    pub fn is_production(&self) -> bool {
        self.app_env.eq_ignore_ascii_case("production")
    }

    /// Cloud credentials present ⇒ cloud source; otherwise poll devices directly.
    pub fn live_source(&self) -> LiveSourceConfig {
        let credentials = match (
            non_empty(&self.ultimaker_client_id),
            non_empty(&self.ultimaker_client_secret),
        ) {
            (Some(id), Some(secret)) => Some((id, secret)),
            _ => None,
        };

        match credentials {
            Some((client_id, client_secret)) => LiveSourceConfig::Cloud(CloudConfig {
                client_id: client_id.to_string(),
                client_secret: client_secret.to_string(),
                base_url: self.ultimaker_base_url.clone(),
                timeout: Duration::from_secs(self.cloud_timeout_secs),
            }),
            None => LiveSourceConfig::Device(DeviceConfig {
                addresses: parse_printer_ips(self.printer_ips.as_deref()),
                timeout: Duration::from_millis(self.device_timeout_ms),
            }),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Parse the key → host map. Invalid JSON disables direct polling instead of
/// failing startup.
pub fn parse_printer_ips(raw: Option<&str>) -> HashMap<String, String> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return HashMap::new();
    };

    match serde_json::from_str(raw) {
        Ok(map) => map,
        Err(e) => {
            tracing::warn!(error = %e, "PRINTER_IPS is not a valid JSON object of strings; live data unavailable");
            HashMap::new()
        }
    }
}
