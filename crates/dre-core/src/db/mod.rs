//! Database access layer with connection pooling and migrations
//!
//! This module is organized by domain:
//! - `records` - Ledger record persistence and the `RecordStore` impl

use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use tracing::info;

use crate::error::{Error, Result};

mod records;


pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Environment variable for database encryption key
pub const DB_KEY_ENV: &str = "DRE_DB_KEY";

/// Connections kept by the pool
const POOL_SIZE: u32 = 10;

/// Argon2 salt for the SQLCipher key; changing it locks out existing databases
const KEY_SALT: &[u8; 16] = b"dre-salt-v1-hits";

/// Turn the `DRE_DB_KEY` passphrase into a hex SQLCipher key
///
/// The salt is fixed, so a database file can be moved or restored anywhere
/// and still open with the same passphrase.
fn derive_key(passphrase: &str) -> Result<String> {
    use argon2::{password_hash::SaltString, Argon2, PasswordHasher};

    let salt = SaltString::encode_b64(KEY_SALT)
        .map_err(|e| Error::Encryption(format!("Invalid key salt: {}", e)))?;

    let digest = Argon2::default()
        .hash_password(passphrase.as_bytes(), &salt)
        .map_err(|e| Error::Encryption(format!("Key derivation failed: {}", e)))?
        .hash
        .ok_or_else(|| Error::Encryption("Key derivation produced no output".to_string()))?;

    Ok(hex::encode(digest.as_bytes()))
}

/// Parse a SQLite datetime string into a DateTime<Utc>
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    // SQLite stores as "YYYY-MM-DD HH:MM:SS" format
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.and_utc())
        .unwrap_or_else(|_| Utc::now())
}

/// Database wrapper with connection pooling
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    /// Path to the database file
    db_path: String,
    /// Opened with a SQLCipher key
    encrypted: bool,
}

impl Database {
    /// Create a new database connection pool with encryption
    ///
    /// Requires `DRE_DB_KEY` environment variable to be set.
    /// The database will be encrypted using SQLCipher with a key derived
    /// from the passphrase via Argon2.
    ///
    /// Returns an error if `DRE_DB_KEY` is not set. Use `new_unencrypted()`
    /// for development/testing without encryption.
    pub fn new(path: &str) -> Result<Self> {
        match std::env::var(DB_KEY_ENV).ok() {
            Some(key) => Self::new_with_key(path, Some(&key)),
            None => Err(Error::Encryption(format!(
                "Database encryption required. Set {} environment variable with your passphrase, \
                or use --no-encrypt for unencrypted databases (not recommended for production).",
                DB_KEY_ENV
            ))),
        }
    }

    /// Create a new unencrypted database connection pool
    ///
    /// WARNING: This creates an unencrypted database. Only use for development
    /// or testing. For production, use `new()` with `DRE_DB_KEY` set.
    pub fn new_unencrypted(path: &str) -> Result<Self> {
        Self::new_with_key(path, None)
    }

    /// Open a database, keyed with `passphrase` when one is given
    pub fn new_with_key(path: &str, passphrase: Option<&str>) -> Result<Self> {
        let key_pragma = passphrase
            .map(|pass| derive_key(pass).map(|key| format!("PRAGMA key = 'x\"{}\"';", key)))
            .transpose()?;

        // The key pragma must run first on every pooled connection
        let manager = SqliteConnectionManager::file(path).with_init(move |conn| {
            if let Some(pragma) = &key_pragma {
                conn.execute_batch(pragma)?;
            }
            Ok(())
        });

        let db = Self {
            pool: Pool::builder().max_size(POOL_SIZE).build(manager)?,
            db_path: path.to_string(),
            encrypted: passphrase.is_some(),
        };
        db.run_migrations()?;

        Ok(db)
    }

    pub fn path(&self) -> &str {
        &self.db_path
    }

    /// Fresh unencrypted database in the temp dir, for tests
    ///
    /// A file rather than `:memory:` so every pooled connection sees the
    /// same data.
    pub fn in_memory() -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static NEXT_ID: AtomicU64 = AtomicU64::new(0);

        let file = format!(
            "dre_test_{}_{}.db",
            std::process::id(),
            NEXT_ID.fetch_add(1, Ordering::SeqCst)
        );
        let path = std::env::temp_dir().join(file).to_string_lossy().to_string();
        let _ = std::fs::remove_file(&path);

        Self::new_unencrypted(&path)
    }

    /// Whether this database was opened with a SQLCipher key
    pub fn is_encrypted(&self) -> bool {
        self.encrypted
    }

    /// Get a connection from the pool
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    /// Run database migrations
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- WAL mode: readers don't block the import writer
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;

            -- Imported ledger lines, replaced wholesale by each import
            CREATE TABLE IF NOT EXISTS dre_hitss (
                id INTEGER PRIMARY KEY,
                batch_id TEXT NOT NULL,
                source_file_name TEXT NOT NULL,
                classification TEXT NOT NULL,              -- revenue, cost
                nature TEXT,                               -- raw Natureza
                project TEXT NOT NULL,
                amount REAL NOT NULL,
                period TEXT NOT NULL,                      -- "month/year"
                account_category TEXT NOT NULL,
                account_summary TEXT,                      -- raw ContaResumo
                account_name TEXT,                         -- DenominacaoConta
                business_line TEXT,                        -- LinhaNegocio
                raw_payload TEXT NOT NULL,                 -- JSON of the source row
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_dre_hitss_batch ON dre_hitss(batch_id);
            CREATE INDEX IF NOT EXISTS idx_dre_hitss_project ON dre_hitss(project);
            CREATE INDEX IF NOT EXISTS idx_dre_hitss_period ON dre_hitss(period);
            "#,
        )?;

        info!("Database migrations complete: {}", self.db_path);
        Ok(())
    }
}
