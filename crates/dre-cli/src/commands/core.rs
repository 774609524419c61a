//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_store` - Shared utility to open the selected record store
//! - `report_service` - Report service over a store with a fresh cache
//! - `cmd_init` - Initialize the local database
//! - `cmd_status` - Show the store and its record count

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use dre_core::{RecordCache, RecordStore, ReportService, StoreClient, StoreKind};
use tracing::debug;

/// Open the record store; the database path and encryption only apply to sqlite
pub fn open_store(db_path: &Path, kind: StoreKind, no_encrypt: bool) -> Result<StoreClient> {
    let path_str = db_path
        .to_str()
        .context("Database path is not valid UTF-8")?;

    let store = StoreClient::open(kind, path_str, no_encrypt)
        .with_context(|| format!("Failed to open {} store", kind))?;
    debug!(store = %kind, location = %store.location(), "Opened record store");
    Ok(store)
}

pub fn report_service(store: StoreClient) -> ReportService<StoreClient> {
    ReportService::new(store, Arc::new(RecordCache::from_env()))
}

pub async fn cmd_init(db_path: &Path, no_encrypt: bool) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    let store = open_store(db_path, StoreKind::Sqlite, no_encrypt)?;
    let count = store.count().await.context("Failed to read record count")?;
    println!("   Records: {}", count);

    if no_encrypt {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    } else {
        println!("   🔒 Encryption: ENABLED");
    }

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Import a ledger export: dre import --file dre.xlsx");
    println!("  2. View the monthly report: dre report --year 2024");
    println!("  3. Start the API: dre serve");

    Ok(())
}

pub async fn cmd_status(store: &StoreClient) -> Result<()> {
    println!("📦 Store: {} ({})", store.kind(), store.location());

    if let StoreClient::Sqlite(db) = store {
        if db.is_encrypted() {
            println!("   🔒 Encryption: ENABLED");
        } else {
            println!("   ⚠️  Encryption: DISABLED");
        }
    }

    let count = store.count().await.context("Failed to read record count")?;
    println!("   Records: {}", count);

    Ok(())
}
