use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};

use crate::models::printer::{NewPrinter, PrinterRecord, PrinterStatus, PrinterUpdate};

const PRINTER_COLUMNS: &str =
    "id, name, printer_key, status, estimated_finish, photo_url, last_updated";

fn printer_from_row(row: &PgRow) -> Result<PrinterRecord, sqlx::Error> {
    let status_str: String = row.try_get("status")?;
    let status = status_str
        .parse::<PrinterStatus>()
        .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

    Ok(PrinterRecord {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        printer_key: row.try_get("printer_key")?,
        status,
        estimated_finish: row.try_get("estimated_finish")?,
        photo_url: row.try_get("photo_url")?,
        last_updated: row.try_get("last_updated")?,
    })
}

/// Insert a new printer; it starts out available with no finish estimate.
pub async fn create_printer(
    pool: &PgPool,
    id: &str,
    printer: &NewPrinter,
) -> Result<PrinterRecord, sqlx::Error> {
    let row = sqlx::query(&format!(
        r#"
        INSERT INTO printers (id, name, printer_key, status, last_updated)
        VALUES ($1, $2, $3, 'available', NOW())
        RETURNING {PRINTER_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(&printer.name)
    .bind(printer.printer_key.as_deref())
    .fetch_one(pool)
    .await?;

    printer_from_row(&row)
}

/// Get a printer by ID
pub async fn get_printer(pool: &PgPool, id: &str) -> Result<Option<PrinterRecord>, sqlx::Error> {
    let row = sqlx::query(&format!(
        "SELECT {PRINTER_COLUMNS} FROM printers WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(printer_from_row).transpose()
}

/// All printers, ordered by name
pub async fn list_printers(pool: &PgPool) -> Result<Vec<PrinterRecord>, sqlx::Error> {
    let rows = sqlx::query(&format!(
        "SELECT {PRINTER_COLUMNS} FROM printers ORDER BY name ASC, id ASC"
    ))
    .fetch_all(pool)
    .await?;

    rows.iter().map(printer_from_row).collect()
}

/// Apply a partial update. Returns whether a row was touched.
pub async fn update_printer(
    pool: &PgPool,
    id: &str,
    update: &PrinterUpdate,
) -> Result<bool, sqlx::Error> {
    let mut query: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE printers SET last_updated = ");
    query.push_bind(update.last_updated);

    if let Some(name) = &update.name {
        query.push(", name = ").push_bind(name.clone());
    }
    if let Some(status) = update.status {
        query.push(", status = ").push_bind(status.to_string());
    }
    if let Some(estimated_finish) = update.estimated_finish {
        query.push(", estimated_finish = ").push_bind(estimated_finish);
    }
    if let Some(photo_url) = &update.photo_url {
        query.push(", photo_url = ").push_bind(photo_url.clone());
    }
    if let Some(printer_key) = &update.printer_key {
        query.push(", printer_key = ").push_bind(printer_key.clone());
    }

    query.push(" WHERE id = ").push_bind(id.to_string());

    let result = query.build().execute(pool).await?;
    Ok(result.rows_affected() > 0)
}

/// Delete a printer. Returns whether it existed.
pub async fn delete_printer(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM printers WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
