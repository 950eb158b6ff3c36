//! PostgreSQL-backed printer store.
//!
//! Requires a reachable database in `DATABASE_URL`.

use chrono::{Duration, TimeZone, Utc};

use makerspace_printers::db::{self, PgPrinterStore, PrinterStore, StoreError};
use makerspace_printers::models::printer::{NewPrinter, PrinterStatus, PrinterUpdate};

async fn store() -> PgPrinterStore {
    dotenvy::dotenv().ok();
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = db::init_pool(&url)
        .await
        .expect("Failed to connect to database");
    db::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");
    PgPrinterStore::new(pool)
}

#[tokio::test]
#[ignore] // Run with: cargo test --test postgres_test -- --ignored
async fn test_printer_lifecycle() {
    let store = store().await;
    store.health_check().await.unwrap();

    let id = store
        .create(NewPrinter {
            name: "UMS5-test".to_string(),
            printer_key: Some("ums5-test".to_string()),
        })
        .await
        .unwrap();

    let created = store.get(&id).await.unwrap();
    assert_eq!(created.status, PrinterStatus::Available);
    assert_eq!(created.printer_key.as_deref(), Some("ums5-test"));
    assert!(store.list().await.unwrap().iter().any(|p| p.id == id));

    let now = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
    let finish = now + Duration::minutes(20);
    store
        .update(
            &id,
            PrinterUpdate {
                status: Some(PrinterStatus::InUse),
                estimated_finish: Some(Some(finish)),
                ..PrinterUpdate::touch(now)
            },
        )
        .await
        .unwrap();

    let updated = store.get(&id).await.unwrap();
    assert_eq!(updated.status, PrinterStatus::InUse);
    assert_eq!(updated.estimated_finish, Some(finish));
    assert_eq!(updated.last_updated, now);
    assert_eq!(updated.name, "UMS5-test");

    // Clearing a nullable field leaves the rest alone.
    store
        .update(
            &id,
            PrinterUpdate {
                estimated_finish: Some(None),
                ..PrinterUpdate::touch(now)
            },
        )
        .await
        .unwrap();
    let cleared = store.get(&id).await.unwrap();
    assert_eq!(cleared.estimated_finish, None);
    assert_eq!(cleared.status, PrinterStatus::InUse);

    store.delete(&id).await.unwrap();
    assert!(matches!(store.get(&id).await, Err(StoreError::NotFound(_))));
    assert!(matches!(
        store.update(&id, PrinterUpdate::touch(now)).await,
        Err(StoreError::NotFound(_))
    ));
}
