//! Pluggable record store abstraction
//!
//! The importer and report service are handed a store explicitly instead of
//! reaching for a global client.
//!
//! # Architecture
//!
//! - `RecordStore` trait: the four operations the pipeline needs
//! - `StoreClient` enum: concrete wrapper providing Clone + compile-time dispatch
//! - Implementations: `Database` (SQLite), `RestStore` (hosted), `MemoryStore` (tests)
//!
//! # Configuration
//!
//! Environment variables:
//! - `DRE_STORE`: Store to use (sqlite, rest, memory). Default: sqlite
//! - `DRE_DB_KEY`: SQLCipher passphrase for the sqlite store
//! - `DRE_DATABASE_URL`: Hosted service URL (required for rest)
//! - `DRE_API_KEY`: Hosted service API key (required for rest)

mod memory;
mod rest;

pub use memory::MemoryStore;
pub use rest::RestStore;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{FinancialRecord, StoredRecord};

/// Table holding the imported ledger lines
pub const RECORDS_TABLE: &str = "dre_hitss";

/// Rows fetched per page when reading the whole table
pub const FETCH_PAGE_SIZE: usize = 1000;

/// Environment variable selecting the store backend
pub const STORE_ENV: &str = "DRE_STORE";

/// Operations the import and report pipeline needs from a store
///
/// Implementations must be Send + Sync to allow use across async tasks.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Delete every record in the table
    async fn clear(&self) -> Result<()>;

    /// Insert one batch of records
    async fn insert_batch(&self, records: &[FinancialRecord]) -> Result<()>;

    /// Read a window of records ordered by id
    async fn fetch_page(&self, offset: usize, limit: usize) -> Result<Vec<StoredRecord>>;

    /// Number of records currently stored
    async fn count(&self) -> Result<i64>;

    /// Where the records live (for logging)
    fn location(&self) -> String;
}

/// Result of a full-table read
#[derive(Debug, Clone, Default)]
pub struct FetchedRecords {
    pub records: Vec<StoredRecord>,
    /// False when a page after the first failed and the read stopped early
    pub complete: bool,
}

/// Read the whole table, one page at a time
///
/// Stops at the first empty or short page. A failing page ends the loop:
/// if earlier pages succeeded their records are returned, otherwise the
/// error is.
pub async fn fetch_all_records<S: RecordStore + ?Sized>(store: &S) -> Result<Vec<StoredRecord>> {
    fetch_records(store).await.map(|fetched| fetched.records)
}

/// Like [`fetch_all_records`], but reports whether every page was read
pub async fn fetch_records<S: RecordStore + ?Sized>(store: &S) -> Result<FetchedRecords> {
    let mut records = Vec::new();
    let mut offset = 0;

    loop {
        let page = match store.fetch_page(offset, FETCH_PAGE_SIZE).await {
            Ok(page) => page,
            Err(e) if offset > 0 => {
                warn!(offset, error = %e, "Record page fetch failed, returning partial result");
                return Ok(FetchedRecords {
                    records,
                    complete: false,
                });
            }
            Err(e) => return Err(e),
        };

        let fetched = page.len();
        debug!(offset, fetched, "Fetched record page");
        records.extend(page);

        if fetched < FETCH_PAGE_SIZE {
            break;
        }
        offset += fetched;
    }

    Ok(FetchedRecords {
        records,
        complete: true,
    })
}

/// Backend selector for `StoreClient::open`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreKind {
    #[default]
    Sqlite,
    Rest,
    Memory,
}

impl StoreKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Rest => "rest",
            Self::Memory => "memory",
        }
    }

    /// Read `DRE_STORE`, defaulting to sqlite
    pub fn from_env() -> Self {
        match std::env::var(STORE_ENV) {
            Ok(value) => value.parse().unwrap_or_else(|e: String| {
                warn!(store = %value, "{}, falling back to sqlite", e);
                Self::Sqlite
            }),
            Err(_) => Self::Sqlite,
        }
    }
}

impl std::str::FromStr for StoreKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" | "local" => Ok(Self::Sqlite),
            "rest" | "hosted" | "supabase" | "postgrest" => Ok(Self::Rest),
            "memory" => Ok(Self::Memory),
            _ => Err(format!("Unknown store: {}", s)),
        }
    }
}

impl std::fmt::Display for StoreKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Concrete store enum
///
/// Provides Clone and compile-time dispatch without Box<dyn> overhead.
#[derive(Clone)]
pub enum StoreClient {
    /// Local SQLite database
    Sqlite(Database),
    /// Hosted PostgREST-style service
    Rest(RestStore),
    /// In-memory store (tests, dry runs)
    Memory(MemoryStore),
}

impl StoreClient {
    /// Open the store selected by `DRE_STORE`
    pub fn from_env(db_path: &str, no_encrypt: bool) -> Result<Self> {
        Self::open(StoreKind::from_env(), db_path, no_encrypt)
    }

    /// Open a specific store kind
    ///
    /// `db_path` and `no_encrypt` only apply to the sqlite store.
    pub fn open(kind: StoreKind, db_path: &str, no_encrypt: bool) -> Result<Self> {
        match kind {
            StoreKind::Sqlite => {
                let db = if no_encrypt {
                    Database::new_unencrypted(db_path)?
                } else {
                    Database::new(db_path)?
                };
                Ok(StoreClient::Sqlite(db))
            }
            StoreKind::Rest => RestStore::from_env().map(StoreClient::Rest).ok_or_else(|| {
                Error::Config(format!(
                    "The rest store requires {} and {}",
                    rest::DATABASE_URL_ENV,
                    rest::API_KEY_ENV
                ))
            }),
            StoreKind::Memory => Ok(StoreClient::Memory(MemoryStore::new())),
        }
    }

    pub fn kind(&self) -> StoreKind {
        match self {
            StoreClient::Sqlite(_) => StoreKind::Sqlite,
            StoreClient::Rest(_) => StoreKind::Rest,
            StoreClient::Memory(_) => StoreKind::Memory,
        }
    }
}

// Implement RecordStore for StoreClient by delegating to the inner store
#[async_trait]
impl RecordStore for StoreClient {
    async fn clear(&self) -> Result<()> {
        match self {
            StoreClient::Sqlite(s) => s.clear().await,
            StoreClient::Rest(s) => s.clear().await,
            StoreClient::Memory(s) => s.clear().await,
        }
    }

    async fn insert_batch(&self, records: &[FinancialRecord]) -> Result<()> {
        match self {
            StoreClient::Sqlite(s) => s.insert_batch(records).await,
            StoreClient::Rest(s) => s.insert_batch(records).await,
            StoreClient::Memory(s) => s.insert_batch(records).await,
        }
    }

    async fn fetch_page(&self, offset: usize, limit: usize) -> Result<Vec<StoredRecord>> {
        match self {
            StoreClient::Sqlite(s) => s.fetch_page(offset, limit).await,
            StoreClient::Rest(s) => s.fetch_page(offset, limit).await,
            StoreClient::Memory(s) => s.fetch_page(offset, limit).await,
        }
    }

    async fn count(&self) -> Result<i64> {
        match self {
            StoreClient::Sqlite(s) => s.count().await,
            StoreClient::Rest(s) => s.count().await,
            StoreClient::Memory(s) => s.count().await,
        }
    }

    fn location(&self) -> String {
        match self {
            StoreClient::Sqlite(s) => s.location(),
            StoreClient::Rest(s) => s.location(),
            StoreClient::Memory(s) => s.location(),
        }
    }
}
