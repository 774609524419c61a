//! Record listing handlers

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use dre_core::StoredRecord;

use crate::{AppError, AppState, MAX_PAGE_LIMIT};

#[derive(Debug, Deserialize)]
pub struct ListRecordsQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    100
}

/// GET /api/records - First records of the table, ordered by id
pub async fn list_records(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListRecordsQuery>,
) -> Result<Json<Vec<StoredRecord>>, AppError> {
    let limit = query.limit.clamp(1, MAX_PAGE_LIMIT);
    let records = state.reports.records(Some(limit)).await?;
    Ok(Json(records))
}
