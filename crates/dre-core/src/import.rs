//! Batch import of ledger spreadsheets
//!
//! An import is a full replace: surviving rows are normalized under one
//! batch id, the table is cleared, then the records are inserted in chunks.
//! Chunk failures are collected and reported, not raised.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cache::RecordCache;
use crate::error::Result;
use crate::models::{FinancialRecord, ImportResult, RawRow};
use crate::normalize::{is_actual_row, normalize_row};
use crate::spreadsheet::{read_rows, SheetFormat};
use crate::store::RecordStore;

/// Records sent per insert call
pub const DEFAULT_CHUNK_SIZE: usize = 500;

/// Message reported when no row passes the filter
pub const NO_VALID_ROWS: &str =
    "No valid rows found (expected Relatorio = 'Realizado' with a Lancamento amount)";

/// Imports spreadsheets into a record store
///
/// Clones share the same import lock, so a server holding one importer runs
/// imports one at a time.
#[derive(Clone)]
pub struct Importer<S> {
    store: S,
    chunk_size: usize,
    cache: Option<Arc<RecordCache>>,
    lock: Arc<Mutex<()>>,
}

impl<S: RecordStore> Importer<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            chunk_size: DEFAULT_CHUNK_SIZE,
            cache: None,
            lock: Arc::new(Mutex::new(())),
        }
    }

    /// Override the chunk size (minimum 1)
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Invalidate this cache whenever an import rewrites the table
    pub fn with_cache(mut self, cache: Arc<RecordCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Read a spreadsheet from disk and import it
    pub async fn import_file(&self, path: &Path) -> Result<ImportResult> {
        let format = SheetFormat::from_path(path)?;
        let data = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());

        let rows = read_rows(&data, format)?;
        Ok(self.import_rows(&rows, &file_name).await)
    }

    /// Import spreadsheet bytes, detecting the format from `file_name`
    pub async fn import_bytes(&self, data: &[u8], file_name: &str) -> Result<ImportResult> {
        let format = SheetFormat::from_file_name(file_name)?;
        let rows = read_rows(data, format)?;
        Ok(self.import_rows(&rows, file_name).await)
    }

    /// Filter, normalize and persist already-parsed rows
    ///
    /// Store failures end up in `ImportResult::errors`: a failed clear aborts
    /// the import, a failed chunk is recorded and the next chunk is tried.
    pub async fn import_rows(&self, rows: &[RawRow], file_name: &str) -> ImportResult {
        let batch_id = Uuid::new_v4().to_string();

        let records: Vec<FinancialRecord> = rows
            .iter()
            .filter(|row| is_actual_row(row))
            .map(|row| normalize_row(row, &batch_id, file_name))
            .collect();

        info!(
            "Importing {}: {} of {} rows retained (batch {})",
            file_name,
            records.len(),
            rows.len(),
            batch_id
        );

        if records.is_empty() {
            return ImportResult::failure(&batch_id, NO_VALID_ROWS.to_string());
        }

        let _guard = self.lock.lock().await;

        if let Err(e) = self.store.clear().await {
            warn!("Clearing {} failed: {}", self.store.location(), e);
            return ImportResult::failure(&batch_id, format!("clear: {}", e));
        }

        let mut count = 0;
        let mut errors = Vec::new();

        for (index, chunk) in records.chunks(self.chunk_size).enumerate() {
            let number = index + 1;
            match self.store.insert_batch(chunk).await {
                Ok(()) => {
                    count += chunk.len();
                    debug!("Chunk {} stored ({} records)", number, chunk.len());
                }
                Err(e) => {
                    warn!("Chunk {} failed: {}", number, e);
                    errors.push(format!("chunk {}: {}", number, e));
                }
            }
        }

        if let Some(cache) = &self.cache {
            cache.invalidate().await;
        }

        info!(
            "Import {} finished: {} records stored, {} chunk errors",
            batch_id,
            count,
            errors.len()
        );

        ImportResult {
            success: errors.is_empty(),
            count,
            batch_id,
            errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AccountCategory, Classification};
    use crate::store::MemoryStore;
    use serde_json::{json, Value};

    fn row(value: Value) -> RawRow {
        value.as_object().cloned().unwrap()
    }

    fn actual_rows(n: usize) -> Vec<RawRow> {
        (0..n)
            .map(|i| {
                row(json!({
                    "Relatorio": "Realizado",
                    "Natureza": "CUSTO",
                    "Lancamento": format!("{},00", i),
                    "Projeto": "Alpha",
                    "Periodo": "1/2024"
                }))
            })
            .collect()
    }

    #[tokio::test]
    async fn test_forecast_rows_are_dropped() {
        let store = MemoryStore::new();
        let importer = Importer::new(store.clone());

        let rows = vec![
            row(json!({"Relatorio": "Realizado", "Lancamento": "10", "Natureza": "RECEITA"})),
            row(json!({"Relatorio": "Previsto", "Lancamento": "99"})),
            row(json!({"Relatorio": "Realizado", "Lancamento": ""})),
        ];

        let result = importer.import_rows(&rows, "dre.xlsx").await;
        assert!(result.success);
        assert_eq!(result.count, 1);
        assert_eq!(store.records().len(), 1);
        assert_eq!(store.records()[0].record.amount, 10.0);
    }

    #[tokio::test]
    async fn test_no_valid_rows_leaves_store_untouched() {
        let store = MemoryStore::new();
        store
            .insert_batch(&[crate::test_utils::sample_record("Old", "1/2023", 1.0)])
            .await
            .unwrap();
        let importer = Importer::new(store.clone());

        let rows = vec![row(json!({"Relatorio": "Previsto", "Lancamento": "5"}))];
        let result = importer.import_rows(&rows, "forecast.csv").await;

        assert!(!result.success);
        assert_eq!(result.count, 0);
        assert_eq!(result.errors, vec![NO_VALID_ROWS.to_string()]);
        assert_eq!(store.clear_calls(), 0);
        assert!(store.insert_calls().is_empty());
        assert_eq!(store.records().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let store = MemoryStore::new();
        let result = Importer::new(store.clone()).import_rows(&[], "empty.csv").await;
        assert!(!result.success);
        assert_eq!(store.clear_calls(), 0);
    }

    #[tokio::test]
    async fn test_import_replaces_previous_data() {
        let store = MemoryStore::new();
        let importer = Importer::new(store.clone());

        let first = importer.import_rows(&actual_rows(3), "jan.csv").await;
        let second = importer.import_rows(&actual_rows(2), "feb.csv").await;

        assert!(first.success && second.success);
        let records = store.records();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.record.batch_id == second.batch_id));
        assert!(records.iter().all(|r| r.record.source_file_name == "feb.csv"));
        assert_ne!(first.batch_id, second.batch_id);
    }

    #[tokio::test]
    async fn test_batch_id_is_shared_uuid() {
        let store = MemoryStore::new();
        let result = Importer::new(store.clone()).import_rows(&actual_rows(4), "a.csv").await;

        assert!(Uuid::parse_str(&result.batch_id).is_ok());
        assert!(store.records().iter().all(|r| r.record.batch_id == result.batch_id));
    }

    #[tokio::test]
    async fn test_chunks_of_500() {
        let store = MemoryStore::new();
        let result = Importer::new(store.clone()).import_rows(&actual_rows(1200), "big.csv").await;

        assert!(result.success);
        assert_eq!(result.count, 1200);
        assert_eq!(store.insert_calls(), vec![500, 500, 200]);
    }

    #[tokio::test]
    async fn test_failed_chunk_is_reported_and_import_continues() {
        let store = MemoryStore::new();
        store.fail_insert_call(2, "timeout");

        let result = Importer::new(store.clone()).import_rows(&actual_rows(1200), "big.csv").await;

        assert!(!result.success);
        assert_eq!(result.count, 700);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].starts_with("chunk 2: "));
        assert!(result.errors[0].contains("timeout"));
        assert_eq!(store.insert_calls(), vec![500, 500, 200]);
        assert_eq!(store.records().len(), 700);
    }

    #[tokio::test]
    async fn test_clear_failure_aborts_import() {
        let store = MemoryStore::new();
        store.fail_clear("permission denied");

        let result = Importer::new(store.clone()).import_rows(&actual_rows(3), "a.csv").await;

        assert!(!result.success);
        assert_eq!(result.count, 0);
        assert!(result.errors[0].starts_with("clear: "));
        assert!(store.insert_calls().is_empty());
    }

    #[tokio::test]
    async fn test_custom_chunk_size() {
        let store = MemoryStore::new();
        let importer = Importer::new(store.clone()).with_chunk_size(2);
        importer.import_rows(&actual_rows(5), "a.csv").await;
        assert_eq!(store.insert_calls(), vec![2, 2, 1]);

        assert_eq!(Importer::new(MemoryStore::new()).with_chunk_size(0).chunk_size(), 1);
    }

    #[tokio::test]
    async fn test_import_invalidates_cache() {
        let store = MemoryStore::new();
        let cache = Arc::new(RecordCache::default());
        let importer = Importer::new(store.clone()).with_cache(cache.clone());

        importer.import_rows(&actual_rows(1), "a.csv").await;
        assert_eq!(cache.get_or_fetch(&store).await.unwrap().len(), 1);

        importer.import_rows(&actual_rows(3), "b.csv").await;
        assert!(!cache.is_warm().await);
        assert_eq!(cache.get_or_fetch(&store).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_end_to_end_revenue_row() {
        let store = MemoryStore::new();
        let rows = vec![row(json!({
            "Relatorio": "Realizado",
            "Natureza": "RECEITA",
            "Lancamento": "10.000,00",
            "Projeto": "Alpha",
            "Periodo": "1/2024",
            "ContaResumo": "Receita Bruta"
        }))];

        let result = Importer::new(store.clone()).import_rows(&rows, "dre.xlsx").await;
        assert!(result.success);

        let record = &store.records()[0].record;
        assert_eq!(record.amount, 10000.0);
        assert_eq!(record.classification, Classification::Revenue);
        assert_eq!(record.account_category, AccountCategory::RevenueRecognized);
        assert_eq!(record.raw_payload["Lancamento"], "10.000,00");
    }

    #[tokio::test]
    async fn test_import_bytes_csv() {
        let store = MemoryStore::new();
        let csv = "Relatorio;Natureza;Lancamento;Projeto;Periodo\n\
                   Realizado;RECEITA;1.500,00;Alpha;2/2024\n\
                   Previsto;RECEITA;9.999,00;Alpha;2/2024\n";

        let result = Importer::new(store.clone())
            .import_bytes(csv.as_bytes(), "ledger.csv")
            .await
            .unwrap();

        assert_eq!(result.count, 1);
        assert_eq!(store.records()[0].record.amount, 1500.0);
        assert_eq!(store.records()[0].record.source_file_name, "ledger.csv");
    }

    #[tokio::test]
    async fn test_import_bytes_rejects_unknown_format() {
        let result = Importer::new(MemoryStore::new())
            .import_bytes(b"whatever", "ledger.pdf")
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_import_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.csv");
        std::fs::write(
            &path,
            "Relatorio,Natureza,Lancamento,Projeto,Periodo\nRealizado,CUSTO,-400,Beta,3/2024\n",
        )
        .unwrap();

        let store = MemoryStore::new();
        let result = Importer::new(store.clone()).import_file(&path).await.unwrap();

        assert!(result.success);
        assert_eq!(store.records()[0].record.source_file_name, "ledger.csv");
        assert_eq!(store.records()[0].record.amount, -400.0);
    }
}
