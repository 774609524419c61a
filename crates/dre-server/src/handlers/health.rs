//! Health check handler

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use tracing::warn;

use dre_core::RecordStore;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub store: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub records: Option<i64>,
}

/// GET /api/health - Liveness plus record store reachability
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    let store = state.store.kind().to_string();

    match state.store.count().await {
        Ok(count) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok",
                store,
                records: Some(count),
            }),
        ),
        Err(e) => {
            warn!(error = %e, "Health check: record store unreachable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "degraded",
                    store,
                    records: None,
                }),
            )
        }
    }
}
