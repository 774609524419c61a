//! Ledger record operations

use async_trait::async_trait;
use rusqlite::params;
use tracing::debug;

use super::{parse_datetime, Database};
use crate::error::Result;
use crate::models::{AccountCategory, Classification, FinancialRecord, StoredRecord};
use crate::store::RecordStore;

const RECORD_COLUMNS: &str = "id, batch_id, source_file_name, classification, nature, project, \
    amount, period, account_category, account_summary, account_name, business_line, \
    raw_payload, created_at";

impl Database {
    /// Delete every imported record
    pub fn clear_records(&self) -> Result<usize> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM dre_hitss", [])?;
        debug!("Cleared {} records", deleted);
        Ok(deleted)
    }

    /// Insert a batch of records in one transaction
    ///
    /// Either the whole batch is stored or none of it is.
    pub fn insert_records(&self, records: &[FinancialRecord]) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO dre_hitss (
                    batch_id, source_file_name, classification, nature, project, amount,
                    period, account_category, account_summary, account_name, business_line,
                    raw_payload
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )?;

            for record in records {
                stmt.execute(params![
                    record.batch_id,
                    record.source_file_name,
                    record.classification.as_str(),
                    record.nature,
                    record.project,
                    record.amount,
                    record.period,
                    record.account_category.as_str(),
                    record.account_summary,
                    record.account_name,
                    record.business_line,
                    serde_json::to_string(&record.raw_payload)?,
                ])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    /// List records ordered by id
    pub fn list_records(&self, offset: usize, limit: usize) -> Result<Vec<StoredRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM dre_hitss ORDER BY id LIMIT ? OFFSET ?",
            RECORD_COLUMNS
        ))?;

        let records = stmt
            .query_map(params![limit as i64, offset as i64], |row| {
                let classification_str: String = row.get(3)?;
                let category_str: String = row.get(8)?;
                let payload_str: String = row.get(12)?;
                let created_at_str: String = row.get(13)?;

                Ok(StoredRecord {
                    id: row.get(0)?,
                    record: FinancialRecord {
                        batch_id: row.get(1)?,
                        source_file_name: row.get(2)?,
                        classification: classification_str.parse().unwrap_or(Classification::Cost),
                        nature: row.get(4)?,
                        project: row.get(5)?,
                        amount: row.get(6)?,
                        period: row.get(7)?,
                        account_category: category_str.parse().unwrap_or(AccountCategory::Other),
                        account_summary: row.get(9)?,
                        account_name: row.get(10)?,
                        business_line: row.get(11)?,
                        raw_payload: serde_json::from_str(&payload_str)
                            .unwrap_or(serde_json::Value::Null),
                    },
                    created_at: parse_datetime(&created_at_str),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }

    /// Count stored records
    pub fn count_records(&self) -> Result<i64> {
        let conn = self.conn()?;
        let count = conn.query_row("SELECT COUNT(*) FROM dre_hitss", [], |row| row.get(0))?;
        Ok(count)
    }
}

#[async_trait]
impl RecordStore for Database {
    async fn clear(&self) -> Result<()> {
        self.clear_records().map(|_| ())
    }

    async fn insert_batch(&self, records: &[FinancialRecord]) -> Result<()> {
        self.insert_records(records)
    }

    async fn fetch_page(&self, offset: usize, limit: usize) -> Result<Vec<StoredRecord>> {
        self.list_records(offset, limit)
    }

    async fn count(&self) -> Result<i64> {
        self.count_records()
    }

    fn location(&self) -> String {
        format!("sqlite://{}", self.path())
    }
}
