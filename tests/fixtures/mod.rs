//! Printer records and device payloads shared by the integration tests
#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};

use makerspace_printers::models::live::{RawJob, RawTelemetry};
use makerspace_printers::models::printer::{PrinterRecord, PrinterStatus};

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
}

pub fn printer(id: &str, key: Option<&str>, status: PrinterStatus) -> PrinterRecord {
    PrinterRecord {
        id: id.to_string(),
        name: id.to_uppercase(),
        printer_key: key.map(str::to_string),
        status,
        estimated_finish: None,
        photo_url: None,
        last_updated: t0(),
    }
}

/// Device halfway through a 20 minute print.
pub fn printing_halfway() -> RawTelemetry {
    RawTelemetry {
        printer_status: "printing".to_string(),
        job: Some(RawJob {
            name: "bracket_v3.ufp".to_string(),
            status: "printing".to_string(),
            time_elapsed: 600.0,
            time_total: 1200.0,
        }),
    }
}

pub fn idle() -> RawTelemetry {
    RawTelemetry {
        printer_status: "idle".to_string(),
        job: None,
    }
}

/// `/cluster-api/v1/print_jobs` body with a queued job ahead of the printing one.
pub fn device_print_jobs() -> Value {
    json!([
        { "name": "queued.ufp", "status": "queued", "time_elapsed": 0, "time_total": 3000 },
        { "name": "bracket_v3.ufp", "status": "printing", "time_elapsed": 600, "time_total": 1200 }
    ])
}

pub fn device_printers(status: &str) -> Value {
    json!([{ "status": status, "unique_name": "ultimakersystem-ccbdd30044ec" }])
}

/// Digital Factory cluster listing, wrapped the way the API returns it.
pub fn cloud_clusters() -> Value {
    json!({
        "data": [
            {
                "name": "ums5-1",
                "host_name": "ultimakersystem-ccbdd30044ec",
                "printer_status": "printing",
                "print_jobs": [
                    { "name": "gear.ufp", "status": "printing", "time_elapsed": 300, "time_total": 1200 }
                ]
            },
            { "name": "ums5-2", "host_name": "ums5-2.local", "status": "idle" }
        ]
    })
}
