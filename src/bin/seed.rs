use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::collections::HashSet;
use tracing_subscriber::EnvFilter;

use makerspace_printers::{
    config::AppConfig,
    db::{self, PgPrinterStore, PrinterStore},
    models::printer::{NewPrinter, PrinterUpdate},
};

#[derive(Parser)]
#[command(name = "seed")]
#[command(about = "Populate and tidy the makerspace printer collection", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Add UMS5-1..N, skipping printer keys that already exist
    Seed {
        #[arg(long, default_value_t = 8)]
        count: u32,
    },
    /// Rename records keyed `ums5-<n>` to `UMS5-<n>`
    NormalizeNames,
}

#[derive(Debug, Default, PartialEq, Eq)]
struct SeedReport {
    added: usize,
    skipped: usize,
}

#[derive(Debug, Default, PartialEq, Eq)]
struct NormalizeReport {
    ok: usize,
    fixed: usize,
    skipped: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env().context("Failed to load configuration")?;
    let url = config
        .database_url
        .as_deref()
        .context("DATABASE_URL must be set to seed printers")?;

    let pool = db::init_pool(url)
        .await
        .context("Failed to connect to database")?;
    db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    let store = PgPrinterStore::new(pool);

    match cli.command.unwrap_or(Commands::Seed { count: 8 }) {
        Commands::Seed { count } => {
            let report = seed_printers(&store, count).await?;
            tracing::info!(added = report.added, skipped = report.skipped, "Seeding complete");
        }
        Commands::NormalizeNames => {
            let report = normalize_names(&store).await?;
            tracing::info!(
                ok = report.ok,
                fixed = report.fixed,
                skipped = report.skipped,
                "Name normalization complete"
            );
        }
    }

    Ok(())
}

async fn seed_printers(store: &dyn PrinterStore, count: u32) -> Result<SeedReport> {
    let existing: HashSet<String> = store
        .list()
        .await?
        .into_iter()
        .filter_map(|p| p.printer_key)
        .collect();

    let mut report = SeedReport::default();
    for n in 1..=count {
        let name = format!("UMS5-{n}");
        let key = format!("ums5-{n}");
        if existing.contains(&key) {
            tracing::info!(printer = %name, "Printer key already exists, skipped");
            report.skipped += 1;
            continue;
        }
        store
            .create(NewPrinter {
                name: name.clone(),
                printer_key: Some(key),
            })
            .await
            .with_context(|| format!("Failed to add {name}"))?;
        tracing::info!(printer = %name, "Printer added");
        report.added += 1;
    }
    Ok(report)
}

/// `ums5-3` -> `UMS5-3`; anything else has no canonical name.
fn canonical_name(printer_key: &str) -> Option<String> {
    let n = printer_key.strip_prefix("ums5-")?;
    if n.is_empty() || !n.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(format!("UMS5-{n}"))
}

async fn normalize_names(store: &dyn PrinterStore) -> Result<NormalizeReport> {
    let mut report = NormalizeReport::default();
    for printer in store.list().await? {
        let Some(expected) = printer.printer_key.as_deref().and_then(canonical_name) else {
            tracing::info!(printer = %printer.name, "No recognised printer key, skipped");
            report.skipped += 1;
            continue;
        };
        if printer.name == expected {
            report.ok += 1;
            continue;
        }

        let update = PrinterUpdate {
            name: Some(expected.clone()),
            ..PrinterUpdate::touch(Utc::now())
        };
        store
            .update(&printer.id, update)
            .await
            .with_context(|| format!("Failed to rename {}", printer.id))?;
        tracing::info!(from = %printer.name, to = %expected, "Printer renamed");
        report.fixed += 1;
    }
    Ok(report)
}
