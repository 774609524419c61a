//! Import command implementation

use std::path::Path;

use anyhow::{Context, Result};
use dre_core::{ImportResult, Importer, StoreClient};

pub async fn cmd_import(store: StoreClient, file: &Path) -> Result<()> {
    println!("📥 Importing {} into {}...", file.display(), store.kind());

    let importer = Importer::new(store);
    let result = importer
        .import_file(file)
        .await
        .with_context(|| format!("Failed to import {}", file.display()))?;

    print_import_result(&result);

    if !result.success {
        anyhow::bail!("Import finished with {} error(s)", result.errors.len());
    }
    Ok(())
}

fn print_import_result(result: &ImportResult) {
    if result.success {
        println!("✅ Import complete!");
    } else {
        println!("⚠️  Import incomplete");
    }
    println!("   Records:  {}", result.count);
    println!("   Batch:    {}", result.batch_id);

    for error in &result.errors {
        println!("   ❌ {}", error);
    }
}
