use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{new_printer_id, PrinterStore, StoreError};
use crate::models::printer::{NewPrinter, PrinterRecord, PrinterStatus, PrinterUpdate};
use crate::services::clock::{Clock, SystemClock};

/// In-process printer store for local development and tests.
#[derive(Clone)]
pub struct MemoryPrinterStore {
    records: Arc<RwLock<HashMap<String, PrinterRecord>>>,
    updates: Arc<AtomicUsize>,
    fail_updates: Arc<AtomicBool>,
    clock: Arc<dyn Clock>,
}

impl Default for MemoryPrinterStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryPrinterStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// New records take their `last_updated` from `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            records: Arc::default(),
            updates: Arc::default(),
            fail_updates: Arc::default(),
            clock,
        }
    }

    /// Insert a record as-is, replacing any record with the same id.
    pub async fn insert(&self, record: PrinterRecord) {
        self.records.write().await.insert(record.id.clone(), record);
    }

    /// Number of successful `update` calls so far.
    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    /// Make subsequent updates fail with a database error.
    pub fn set_fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }
}

fn apply(record: &mut PrinterRecord, update: PrinterUpdate) {
    if let Some(name) = update.name {
        record.name = name;
    }
    if let Some(status) = update.status {
        record.status = status;
    }
    if let Some(estimated_finish) = update.estimated_finish {
        record.estimated_finish = estimated_finish;
    }
    if let Some(photo_url) = update.photo_url {
        record.photo_url = photo_url;
    }
    if let Some(printer_key) = update.printer_key {
        record.printer_key = printer_key;
    }
    record.last_updated = update.last_updated;
}

#[async_trait]
impl PrinterStore for MemoryPrinterStore {
    async fn get(&self, id: &str) -> Result<PrinterRecord, StoreError> {
        self.records
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn list(&self) -> Result<Vec<PrinterRecord>, StoreError> {
        let mut printers: Vec<_> = self.records.read().await.values().cloned().collect();
        printers.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(printers)
    }

    async fn create(&self, printer: NewPrinter) -> Result<String, StoreError> {
        let id = new_printer_id();
        let record = PrinterRecord {
            id: id.clone(),
            name: printer.name,
            printer_key: printer.printer_key,
            status: PrinterStatus::Available,
            estimated_finish: None,
            photo_url: None,
            last_updated: self.clock.now(),
        };
        self.records.write().await.insert(id.clone(), record);
        Ok(id)
    }

    async fn update(&self, id: &str, update: PrinterUpdate) -> Result<(), StoreError> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }

        let mut records = self.records.write().await;
        let record = records
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        apply(record, update);
        self.updates.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.records.write().await.remove(id);
        Ok(())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
