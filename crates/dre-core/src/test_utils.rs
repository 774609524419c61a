//! Test utilities for dre-core
//!
//! Provides record fixtures and a mock hosted-database server speaking the
//! PostgREST subset used by `RestStore`.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use axum::{
    extract::{Query, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde_json::Value;
use tokio::sync::oneshot;

use crate::models::{AccountCategory, Classification, FinancialRecord, StoredRecord};

/// A cost record with the given project, period and amount
pub fn sample_record(project: &str, period: &str, amount: f64) -> FinancialRecord {
    FinancialRecord {
        batch_id: "test-batch".to_string(),
        source_file_name: "test.csv".to_string(),
        classification: Classification::Cost,
        nature: Some("CUSTO".to_string()),
        project: project.to_string(),
        amount,
        period: period.to_string(),
        account_category: AccountCategory::Other,
        account_summary: None,
        account_name: None,
        business_line: None,
        raw_payload: Value::Null,
    }
}

/// A revenue record with the given project, period and amount
pub fn revenue_record(project: &str, period: &str, amount: f64) -> FinancialRecord {
    FinancialRecord {
        classification: Classification::Revenue,
        nature: Some("RECEITA".to_string()),
        account_category: AccountCategory::RevenueRecognized,
        ..sample_record(project, period, amount)
    }
}

#[derive(Default)]
struct MockTable {
    rows: Vec<StoredRecord>,
    next_id: i64,
}

#[derive(Clone)]
struct MockState {
    api_key: String,
    table: Arc<Mutex<MockTable>>,
    fail_inserts: Arc<AtomicBool>,
}

impl MockState {
    fn authorized(&self, headers: &HeaderMap) -> bool {
        let bearer = format!("Bearer {}", self.api_key);
        headers.get("apikey").and_then(|v| v.to_str().ok()) == Some(self.api_key.as_str())
            && headers.get("authorization").and_then(|v| v.to_str().ok()) == Some(bearer.as_str())
    }

    fn table(&self) -> std::sync::MutexGuard<'_, MockTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Mock hosted database for testing the REST store
pub struct MockRestServer {
    addr: SocketAddr,
    state: MockState,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockRestServer {
    /// Start the mock server on an available port, accepting `api_key`
    pub async fn start(api_key: &str) -> Self {
        let state = MockState {
            api_key: api_key.to_string(),
            table: Arc::new(Mutex::new(MockTable::default())),
            fail_inserts: Arc::new(AtomicBool::new(false)),
        };

        let app = Router::new()
            .route(
                "/rest/v1/dre_hitss",
                get(handle_select).post(handle_insert).delete(handle_delete),
            )
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            state,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Reject every insert with a 500
    pub fn fail_inserts(&self, fail: bool) {
        self.state.fail_inserts.store(fail, Ordering::SeqCst);
    }

    /// Rows currently held by the mock table
    pub fn row_count(&self) -> usize {
        self.state.table().rows.len()
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockRestServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({"message": "Invalid API key"})),
    )
        .into_response()
}

async fn handle_select(
    State(state): State<MockState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if !state.authorized(&headers) {
        return unauthorized();
    }

    let table = state.table();
    let total = table.rows.len();
    let offset: usize = params.get("offset").and_then(|v| v.parse().ok()).unwrap_or(0);
    let limit: usize = params.get("limit").and_then(|v| v.parse().ok()).unwrap_or(total);
    let page: Vec<StoredRecord> = table.rows.iter().skip(offset).take(limit).cloned().collect();

    let range = if page.is_empty() {
        format!("*/{}", total)
    } else {
        format!("{}-{}/{}", offset, offset + page.len() - 1, total)
    };

    let mut response = Json(page).into_response();
    if let Ok(value) = HeaderValue::from_str(&range) {
        response.headers_mut().insert("content-range", value);
    }
    response
}

async fn handle_insert(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(records): Json<Vec<FinancialRecord>>,
) -> Response {
    if !state.authorized(&headers) {
        return unauthorized();
    }
    if state.fail_inserts.load(Ordering::SeqCst) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"message": "insert rejected"})),
        )
            .into_response();
    }

    let mut table = state.table();
    for record in records {
        table.next_id += 1;
        let id = table.next_id;
        table.rows.push(StoredRecord {
            id,
            record,
            created_at: Utc::now(),
        });
    }
    StatusCode::CREATED.into_response()
}

async fn handle_delete(
    State(state): State<MockState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if !state.authorized(&headers) {
        return unauthorized();
    }
    if params.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"message": "DELETE requires a WHERE clause"})),
        )
            .into_response();
    }

    state.table().rows.clear();
    StatusCode::NO_CONTENT.into_response()
}
