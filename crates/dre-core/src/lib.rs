//! DRE Core Library
//!
//! Shared functionality for the DRE ledger import and reporting tool:
//! - Spreadsheet ingestion (CSV and workbooks)
//! - Locale-aware amount parsing and row normalization
//! - Pluggable record stores (SQLite, hosted REST, in-memory)
//! - Batch importer with full-replace semantics
//! - Record cache and monthly P&L aggregation

pub mod aggregate;
pub mod amount;
pub mod cache;
pub mod db;
pub mod error;
pub mod import;
pub mod models;
pub mod normalize;
pub mod reports;
pub mod spreadsheet;
pub mod store;

/// Test utilities including record fixtures and a mock hosted database
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use aggregate::{aggregate, list_projects, list_years, margin};
pub use amount::{parse_amount, parse_amount_str, try_parse_amount, AmountError};
pub use cache::RecordCache;
pub use db::Database;
pub use error::{Error, Result};
pub use import::{Importer, DEFAULT_CHUNK_SIZE};
pub use models::{
    AccountCategory, Classification, FinancialRecord, ImportResult, MonthEntry, MonthlyFigures,
    ProjectAggregate, RawRow, StoredRecord,
};
pub use reports::ReportService;
pub use spreadsheet::SheetFormat;
pub use store::{
    fetch_all_records, fetch_records, FetchedRecords, MemoryStore, RecordStore, RestStore, StoreClient, StoreKind,
};
