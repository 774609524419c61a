//! In-memory record store with failure injection

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;

use super::{RecordStore, RECORDS_TABLE};
use crate::error::{Error, Result};
use crate::models::{FinancialRecord, StoredRecord};

#[derive(Default)]
struct MemoryState {
    records: Vec<StoredRecord>,
    next_id: i64,
    clear_calls: usize,
    insert_calls: Vec<usize>,
    fetch_offsets: Vec<usize>,
    fail_clear: Option<String>,
    /// 1-based insert call number -> error message
    fail_inserts: Vec<(usize, String)>,
    /// Page offset -> error message
    fail_fetches: Vec<(usize, String)>,
}

/// Record store kept in process memory
///
/// Clones share the same table. Failures can be scripted per operation and
/// every call is recorded, which makes it the store of choice for tests.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make every `clear` call fail with the given message
    pub fn fail_clear(&self, message: &str) {
        self.state().fail_clear = Some(message.to_string());
    }

    /// Make the n-th `insert_batch` call (1-based) fail
    pub fn fail_insert_call(&self, call: usize, message: &str) {
        self.state().fail_inserts.push((call, message.to_string()));
    }

    /// Make the page fetch starting at `offset` fail
    pub fn fail_fetch_at(&self, offset: usize, message: &str) {
        self.state().fail_fetches.push((offset, message.to_string()));
    }

    pub fn clear_calls(&self) -> usize {
        self.state().clear_calls
    }

    /// Batch sizes passed to each `insert_batch` call, in order
    pub fn insert_calls(&self) -> Vec<usize> {
        self.state().insert_calls.clone()
    }

    /// Offsets of each `fetch_page` call, in order
    pub fn fetch_offsets(&self) -> Vec<usize> {
        self.state().fetch_offsets.clone()
    }

    pub fn records(&self) -> Vec<StoredRecord> {
        self.state().records.clone()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn clear(&self) -> Result<()> {
        let mut state = self.state();
        state.clear_calls += 1;
        if let Some(message) = &state.fail_clear {
            return Err(Error::Import(message.clone()));
        }
        state.records.clear();
        Ok(())
    }

    async fn insert_batch(&self, records: &[FinancialRecord]) -> Result<()> {
        let mut state = self.state();
        state.insert_calls.push(records.len());

        let call = state.insert_calls.len();
        if let Some((_, message)) = state.fail_inserts.iter().find(|(n, _)| *n == call) {
            return Err(Error::Import(message.clone()));
        }

        let now = Utc::now();
        for record in records {
            state.next_id += 1;
            let id = state.next_id;
            state.records.push(StoredRecord {
                id,
                record: record.clone(),
                created_at: now,
            });
        }
        Ok(())
    }

    async fn fetch_page(&self, offset: usize, limit: usize) -> Result<Vec<StoredRecord>> {
        let mut state = self.state();
        state.fetch_offsets.push(offset);

        if let Some((_, message)) = state.fail_fetches.iter().find(|(o, _)| *o == offset) {
            return Err(Error::Import(message.clone()));
        }

        Ok(state.records.iter().skip(offset).take(limit).cloned().collect())
    }

    async fn count(&self) -> Result<i64> {
        Ok(self.state().records.len() as i64)
    }

    fn location(&self) -> String {
        format!("memory://{}", RECORDS_TABLE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::sample_record;

    #[tokio::test]
    async fn test_insert_assigns_increasing_ids() {
        let store = MemoryStore::new();
        store
            .insert_batch(&[sample_record("A", "1/2024", 1.0), sample_record("B", "1/2024", 2.0)])
            .await
            .unwrap();

        let records = store.records();
        assert_eq!(records[0].id, 1);
        assert_eq!(records[1].id, 2);
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_scripted_failures() {
        let store = MemoryStore::new();
        store.fail_insert_call(2, "boom");

        assert!(store.insert_batch(&[sample_record("A", "1/2024", 1.0)]).await.is_ok());
        assert!(store.insert_batch(&[sample_record("A", "1/2024", 1.0)]).await.is_err());
        assert!(store.insert_batch(&[sample_record("A", "1/2024", 1.0)]).await.is_ok());
        assert_eq!(store.insert_calls(), vec![1, 1, 1]);
        assert_eq!(store.count().await.unwrap(), 2);

        store.fail_clear("denied");
        assert!(store.clear().await.is_err());
        assert_eq!(store.count().await.unwrap(), 2);
        assert_eq!(store.clear_calls(), 1);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let store = MemoryStore::new();
        let other = store.clone();
        other.insert_batch(&[sample_record("A", "1/2024", 1.0)]).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
    }
}
