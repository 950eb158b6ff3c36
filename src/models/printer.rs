use chrono::{DateTime, Utc};
use garde::Validate;
use serde::{Deserialize, Deserializer, Serialize};
use strum::{Display, EnumString, VariantNames};

/// Canonical availability of a printer.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, EnumString, Display, VariantNames, PartialEq, Eq,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PrinterStatus {
    Available,
    InUse,
    Maintenance,
}

/// A persisted printer record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PrinterRecord {
    pub id: String,
    pub name: String,
    /// Cluster name / host alias in the cloud account, or key into the device address map.
    pub printer_key: Option<String>,
    pub status: PrinterStatus,
    /// Only meaningful while `status == InUse`.
    pub estimated_finish: Option<DateTime<Utc>>,
    pub photo_url: Option<String>,
    pub last_updated: DateTime<Utc>,
}

/// Fields for a newly added printer. Always starts out `available`.
#[derive(Debug, Clone, Validate)]
pub struct NewPrinter {
    #[garde(length(chars, min = 1, max = 80))]
    pub name: String,

    #[garde(length(chars, max = 60))]
    pub printer_key: Option<String>,
}

/// Partial update applied to a stored record.
///
/// Outer `None` leaves a field untouched; `Some(None)` clears a nullable field.
#[derive(Debug, Clone)]
pub struct PrinterUpdate {
    pub name: Option<String>,
    pub status: Option<PrinterStatus>,
    pub estimated_finish: Option<Option<DateTime<Utc>>>,
    pub photo_url: Option<Option<String>>,
    pub printer_key: Option<Option<String>>,
    pub last_updated: DateTime<Utc>,
}

impl PrinterUpdate {
    pub fn touch(now: DateTime<Utc>) -> Self {
        Self {
            name: None,
            status: None,
            estimated_finish: None,
            photo_url: None,
            printer_key: None,
            last_updated: now,
        }
    }

    /// Whether applying this update can change what the live endpoint reports.
    pub fn affects_live_status(&self) -> bool {
        self.status.is_some() || self.printer_key.is_some()
    }
}

pub const MAX_NAME_LEN: usize = 80;
pub const MAX_KEY_LEN: usize = 60;
pub const MAX_URL_LEN: usize = 500;

/// Body of `POST /api/printers`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePrinterRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub printer_key: Option<String>,
}

impl CreatePrinterRequest {
    /// Trim inputs; a blank key means "no live integration".
    pub fn into_new_printer(self) -> NewPrinter {
        NewPrinter {
            name: self.name.unwrap_or_default().trim().to_string(),
            printer_key: blank_to_none(self.printer_key),
        }
    }
}

/// Body of `PATCH /api/printers/{id}`.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PatchPrinterRequest {
    #[garde(skip)]
    #[serde(default)]
    pub status: Option<String>,

    #[garde(skip)]
    #[serde(default, deserialize_with = "present")]
    pub estimated_finish: Option<Option<DateTime<Utc>>>,

    #[garde(custom(max_nullable_len::<MAX_URL_LEN>))]
    #[serde(default, deserialize_with = "present")]
    pub photo_url: Option<Option<String>>,

    #[garde(custom(max_nullable_len::<MAX_KEY_LEN>))]
    #[serde(default, deserialize_with = "present")]
    pub printer_key: Option<Option<String>>,
}

impl PatchPrinterRequest {
    /// Convert into a store update, rejecting non-canonical status values.
    pub fn into_update(self, now: DateTime<Utc>) -> Result<PrinterUpdate, String> {
        let status = match self.status {
            Some(raw) => Some(raw.parse::<PrinterStatus>().map_err(|_| {
                format!(
                    "status must be one of: {}",
                    PrinterStatus::VARIANTS.join(", ")
                )
            })?),
            None => None,
        };

        Ok(PrinterUpdate {
            status,
            estimated_finish: self.estimated_finish,
            photo_url: self.photo_url.map(blank_to_none),
            printer_key: self.printer_key.map(blank_to_none),
            ..PrinterUpdate::touch(now)
        })
    }
}

/// Distinguishes an explicit `null` from an absent field.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn max_nullable_len<const MAX: usize>(value: &Option<Option<String>>, _: &()) -> garde::Result {
    match value {
        Some(Some(s)) if s.trim().chars().count() > MAX => Err(garde::Error::new(format!(
            "length must be at most {MAX}"
        ))),
        _ => Ok(()),
    }
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Printer ids are opaque but restricted to URL-safe characters.
pub fn is_valid_id(id: &str) -> bool {
    (1..=128).contains(&id.len())
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
