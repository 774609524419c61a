//! Time-bounded cache over the full record table
//!
//! Reports read every record, so the fetched table is kept for a TTL
//! (five minutes by default). A miss holds the cache lock while fetching:
//! concurrent callers wait on that single in-flight fetch and then read its
//! result instead of issuing their own.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::Result;
use crate::models::StoredRecord;
use crate::store::{fetch_records, RecordStore};

/// Default time-to-live for cached records
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Environment variable overriding the TTL, in seconds
pub const CACHE_TTL_ENV: &str = "DRE_CACHE_TTL_SECS";

struct CachedRecords {
    records: Arc<Vec<StoredRecord>>,
    fetched_at: Instant,
}

/// Cache for full-table reads
///
/// Only complete reads are kept; a table cut short by a failing page is
/// handed to the caller but refetched next time.
pub struct RecordCache {
    ttl: Duration,
    slot: Mutex<Option<CachedRecords>>,
}

impl Default for RecordCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}

impl RecordCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: Mutex::new(None),
        }
    }

    /// Create with the TTL from `DRE_CACHE_TTL_SECS` (default 300)
    pub fn from_env() -> Self {
        let ttl = match std::env::var(CACHE_TTL_ENV) {
            Ok(value) => match value.trim().parse::<u64>() {
                Ok(secs) => Duration::from_secs(secs),
                Err(_) => {
                    warn!("Invalid {}='{}', using default", CACHE_TTL_ENV, value);
                    DEFAULT_CACHE_TTL
                }
            },
            Err(_) => DEFAULT_CACHE_TTL,
        };
        Self::new(ttl)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the cached table, fetching it from `store` when stale
    pub async fn get_or_fetch<S: RecordStore + ?Sized>(
        &self,
        store: &S,
    ) -> Result<Arc<Vec<StoredRecord>>> {
        let mut slot = self.slot.lock().await;

        if let Some(cached) = slot.as_ref() {
            if cached.fetched_at.elapsed() < self.ttl {
                debug!("Record cache hit ({} records)", cached.records.len());
                return Ok(cached.records.clone());
            }
        }

        let fetched = fetch_records(store).await?;
        let records = Arc::new(fetched.records);

        if fetched.complete {
            debug!("Record cache filled with {} records", records.len());
            *slot = Some(CachedRecords {
                records: records.clone(),
                fetched_at: Instant::now(),
            });
        } else {
            warn!("Partial record table not cached ({} records)", records.len());
            *slot = None;
        }

        Ok(records)
    }

    /// Drop the cached table so the next read refetches
    pub async fn invalidate(&self) {
        *self.slot.lock().await = None;
    }

    /// Whether a fresh value is currently cached
    pub async fn is_warm(&self) -> bool {
        self.slot
            .lock()
            .await
            .as_ref()
            .is_some_and(|c| c.fetched_at.elapsed() < self.ttl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::test_utils::sample_record;

    async fn store_with(n: usize) -> MemoryStore {
        let store = MemoryStore::new();
        let records: Vec<_> = (0..n).map(|i| sample_record("Alpha", "1/2024", i as f64)).collect();
        store.insert_batch(&records).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_hit_within_ttl() {
        let store = store_with(3).await;
        let cache = RecordCache::default();

        let first = cache.get_or_fetch(&store).await.unwrap();
        let second = cache.get_or_fetch(&store).await.unwrap();

        assert_eq!(first.len(), 3);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.fetch_offsets(), vec![0]);
        assert!(cache.is_warm().await);
    }

    #[tokio::test]
    async fn test_expired_entry_refetches() {
        let store = store_with(1).await;
        let cache = RecordCache::new(Duration::ZERO);

        cache.get_or_fetch(&store).await.unwrap();
        cache.get_or_fetch(&store).await.unwrap();

        assert_eq!(store.fetch_offsets(), vec![0, 0]);
        assert!(!cache.is_warm().await);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let store = store_with(1).await;
        let cache = RecordCache::default();

        cache.get_or_fetch(&store).await.unwrap();
        store.insert_batch(&[sample_record("Beta", "2/2024", 9.0)]).await.unwrap();
        assert_eq!(cache.get_or_fetch(&store).await.unwrap().len(), 1);

        cache.invalidate().await;
        assert_eq!(cache.get_or_fetch(&store).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_misses_share_one_fetch() {
        let store = store_with(5).await;
        let cache = Arc::new(RecordCache::default());

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                cache.get_or_fetch(&store).await.unwrap().len()
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap(), 5);
        }

        assert_eq!(store.fetch_offsets(), vec![0]);
    }

    #[tokio::test]
    async fn test_partial_table_is_not_cached() {
        let store = store_with(1500).await;
        store.fail_fetch_at(1000, "timeout");
        let cache = RecordCache::default();

        let first = cache.get_or_fetch(&store).await.unwrap();
        assert_eq!(first.len(), 1000);
        assert!(!cache.is_warm().await);

        let healthy = MemoryStore::new();
        let records: Vec<_> = (0..1500).map(|i| sample_record("Alpha", "1/2024", i as f64)).collect();
        healthy.insert_batch(&records).await.unwrap();

        let second = cache.get_or_fetch(&healthy).await.unwrap();
        assert_eq!(second.len(), 1500);
        assert!(cache.is_warm().await);
    }

    #[tokio::test]
    async fn test_fetch_error_is_not_cached() {
        let store = MemoryStore::new();
        store.fail_fetch_at(0, "offline");
        let cache = RecordCache::default();

        assert!(cache.get_or_fetch(&store).await.is_err());
        assert!(!cache.is_warm().await);
    }
}
