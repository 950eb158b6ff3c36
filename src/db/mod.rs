use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;

use crate::models::printer::{NewPrinter, PrinterRecord, PrinterUpdate};

pub mod memory;
pub mod queries;

pub use memory::MemoryPrinterStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("printer {0} not found")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Document-style access to printer records.
#[async_trait]
pub trait PrinterStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<PrinterRecord, StoreError>;

    /// All printers ordered by name.
    async fn list(&self) -> Result<Vec<PrinterRecord>, StoreError>;

    /// Add a printer and return its new id.
    async fn create(&self, printer: NewPrinter) -> Result<String, StoreError>;

    /// Last write wins; `NotFound` if the record is gone.
    async fn update(&self, id: &str, update: PrinterUpdate) -> Result<(), StoreError>;

    async fn delete(&self, id: &str) -> Result<(), StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}

/// Fresh opaque printer id.
pub fn new_printer_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Initialize PostgreSQL connection pool
pub async fn init_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(database_url)
        .await
}

/// Run database migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| sqlx::Error::Migrate(Box::new(e)))
}

/// Printer store backed by PostgreSQL.
#[derive(Clone)]
pub struct PgPrinterStore {
    pool: PgPool,
}

impl PgPrinterStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PrinterStore for PgPrinterStore {
    async fn get(&self, id: &str) -> Result<PrinterRecord, StoreError> {
        queries::get_printer(&self.pool, id)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn list(&self) -> Result<Vec<PrinterRecord>, StoreError> {
        Ok(queries::list_printers(&self.pool).await?)
    }

    async fn create(&self, printer: NewPrinter) -> Result<String, StoreError> {
        let id = new_printer_id();
        let record = queries::create_printer(&self.pool, &id, &printer).await?;
        Ok(record.id)
    }

    async fn update(&self, id: &str, update: PrinterUpdate) -> Result<(), StoreError> {
        if queries::update_printer(&self.pool, id, &update).await? {
            Ok(())
        } else {
            Err(StoreError::NotFound(id.to_string()))
        }
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        queries::delete_printer(&self.pool, id).await?;
        Ok(())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
