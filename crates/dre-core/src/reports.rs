//! Read side: reports computed over the cached record table

use std::sync::Arc;

use crate::aggregate::{aggregate, list_projects, list_years};
use crate::cache::RecordCache;
use crate::error::Result;
use crate::models::{ProjectAggregate, StoredRecord};
use crate::store::RecordStore;

/// Reports over a record store, read through a shared cache
#[derive(Clone)]
pub struct ReportService<S> {
    store: S,
    cache: Arc<RecordCache>,
}

impl<S: RecordStore> ReportService<S> {
    pub fn new(store: S, cache: Arc<RecordCache>) -> Self {
        Self { store, cache }
    }

    pub fn cache(&self) -> &Arc<RecordCache> {
        &self.cache
    }

    /// Every stored record, ordered by id
    pub async fn all_records(&self) -> Result<Arc<Vec<StoredRecord>>> {
        self.cache.get_or_fetch(&self.store).await
    }

    /// Monthly and cumulative figures for `year`, optionally one project
    pub async fn monthly_report(
        &self,
        year: i32,
        project: Option<&str>,
    ) -> Result<Vec<ProjectAggregate>> {
        let records = self.all_records().await?;
        Ok(aggregate(records.iter().map(|r| &r.record), year, project))
    }

    pub async fn projects(&self) -> Result<Vec<String>> {
        let records = self.all_records().await?;
        Ok(list_projects(records.iter().map(|r| &r.record)))
    }

    pub async fn years(&self) -> Result<Vec<i32>> {
        let records = self.all_records().await?;
        Ok(list_years(records.iter().map(|r| &r.record)))
    }

    /// The first `limit` records, or all of them
    pub async fn records(&self, limit: Option<usize>) -> Result<Vec<StoredRecord>> {
        let records = self.all_records().await?;
        let limit = limit.unwrap_or(records.len());
        Ok(records.iter().take(limit).cloned().collect())
    }
}
