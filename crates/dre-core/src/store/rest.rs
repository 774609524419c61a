//! Hosted PostgREST-style record store
//!
//! Talks to a REST data API exposing the records table at
//! `{base_url}/rest/v1/dre_hitss` (Supabase and plain PostgREST both fit).
//!
//! # Configuration
//!
//! Environment variables:
//! - `DRE_DATABASE_URL`: Service URL (required)
//! - `DRE_API_KEY`: Service API key, sent as `apikey` and bearer token (required)

use async_trait::async_trait;
use reqwest::{Client, Response};
use tracing::debug;

use super::{RecordStore, RECORDS_TABLE};
use crate::error::{Error, Result};
use crate::models::{FinancialRecord, StoredRecord};

pub const DATABASE_URL_ENV: &str = "DRE_DATABASE_URL";
pub const API_KEY_ENV: &str = "DRE_API_KEY";

/// Record store backed by a hosted REST data API
#[derive(Clone)]
pub struct RestStore {
    http_client: Client,
    base_url: String,
    api_key: String,
}

impl RestStore {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// Create from environment variables
    ///
    /// Required: `DRE_DATABASE_URL`, `DRE_API_KEY`
    pub fn from_env() -> Option<Self> {
        let url = std::env::var(DATABASE_URL_ENV).ok()?;
        let api_key = std::env::var(API_KEY_ENV).ok()?;
        Some(Self::new(&url, &api_key))
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, RECORDS_TABLE)
    }

    fn request(&self, method: reqwest::Method) -> reqwest::RequestBuilder {
        self.http_client
            .request(method, self.table_url())
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
    }

    /// Turn a non-2xx response into `Error::Remote`
    async fn check(response: Response) -> Result<Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response.text().await.unwrap_or_default();
        Err(Error::Remote { status, message })
    }
}

/// Total row count from a `Content-Range` header (`0-9/42` or `*/0`)
fn parse_content_range_total(header: &str) -> Option<i64> {
    header.rsplit('/').next()?.trim().parse().ok()
}

#[async_trait]
impl RecordStore for RestStore {
    async fn clear(&self) -> Result<()> {
        // PostgREST refuses unfiltered deletes
        let response = self
            .request(reqwest::Method::DELETE)
            .query(&[("id", "gt.0")])
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn insert_batch(&self, records: &[FinancialRecord]) -> Result<()> {
        let response = self
            .request(reqwest::Method::POST)
            .header("Prefer", "return=minimal")
            .json(records)
            .send()
            .await?;
        Self::check(response).await?;
        debug!("Inserted {} records into {}", records.len(), self.table_url());
        Ok(())
    }

    async fn fetch_page(&self, offset: usize, limit: usize) -> Result<Vec<StoredRecord>> {
        let response = self
            .request(reqwest::Method::GET)
            .query(&[
                ("select", "*".to_string()),
                ("order", "id".to_string()),
                ("offset", offset.to_string()),
                ("limit", limit.to_string()),
            ])
            .send()
            .await?;
        let records = Self::check(response).await?.json().await?;
        Ok(records)
    }

    async fn count(&self) -> Result<i64> {
        let response = self
            .request(reqwest::Method::GET)
            .header("Prefer", "count=exact")
            .query(&[("select", "id"), ("limit", "1")])
            .send()
            .await?;
        let response = Self::check(response).await?;

        response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range_total)
            .ok_or_else(|| Error::InvalidData("Missing Content-Range count".to_string()))
    }

    fn location(&self) -> String {
        self.table_url()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{sample_record, MockRestServer};

    #[test]
    fn test_content_range_total() {
        assert_eq!(parse_content_range_total("0-9/42"), Some(42));
        assert_eq!(parse_content_range_total("*/0"), Some(0));
        assert_eq!(parse_content_range_total("0-9/*"), None);
    }

    #[test]
    fn test_table_url_trims_trailing_slash() {
        let store = RestStore::new("https://example.supabase.co/", "key");
        assert_eq!(store.location(), "https://example.supabase.co/rest/v1/dre_hitss");
    }

    #[tokio::test]
    async fn test_round_trip_through_mock_server() {
        let server = MockRestServer::start("secret").await;
        let store = RestStore::new(&server.url(), "secret");

        let records: Vec<_> = (0..5).map(|i| sample_record("Alpha", "2/2024", i as f64)).collect();
        store.insert_batch(&records).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 5);

        let page = store.fetch_page(2, 2).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].id, 3);
        assert_eq!(page[0].record.amount, 2.0);

        store.clear().await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_wrong_key_is_remote_error() {
        let server = MockRestServer::start("secret").await;
        let store = RestStore::new(&server.url(), "wrong");

        let result = store.clear().await;
        assert!(matches!(result, Err(Error::Remote { status: 401, .. })));
    }

    #[tokio::test]
    async fn test_failed_insert_is_remote_error() {
        let server = MockRestServer::start("secret").await;
        server.fail_inserts(true);
        let store = RestStore::new(&server.url(), "secret");

        let result = store.insert_batch(&[sample_record("Alpha", "1/2024", 1.0)]).await;
        match result {
            Err(Error::Remote { status, message }) => {
                assert_eq!(status, 500);
                assert!(message.contains("insert rejected"));
            }
            other => panic!("expected remote error, got {:?}", other.map(|_| ())),
        }
    }
}
