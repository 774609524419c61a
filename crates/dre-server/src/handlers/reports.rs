//! Report handlers

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Datelike;
use serde::Deserialize;

use dre_core::ProjectAggregate;

use crate::{AppError, AppState};

#[derive(Debug, Deserialize)]
pub struct MonthlyReportQuery {
    /// Defaults to the current year
    pub year: Option<i32>,
    pub project: Option<String>,
}

/// GET /api/reports/monthly - Monthly and cumulative figures per project
pub async fn report_monthly(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MonthlyReportQuery>,
) -> Result<Json<Vec<ProjectAggregate>>, AppError> {
    let year = query.year.unwrap_or_else(|| chrono::Utc::now().year());
    if !(1900..=9999).contains(&year) {
        return Err(AppError::bad_request(&format!("Invalid year: {}", year)));
    }

    let project = query.project.as_deref().map(str::trim).filter(|p| !p.is_empty());
    let report = state.reports.monthly_report(year, project).await?;
    Ok(Json(report))
}

/// GET /api/projects - Distinct project names
pub async fn list_projects(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<String>>, AppError> {
    Ok(Json(state.reports.projects().await?))
}

/// GET /api/years - Distinct years with records
pub async fn list_years(State(state): State<Arc<AppState>>) -> Result<Json<Vec<i32>>, AppError> {
    Ok(Json(state.reports.years().await?))
}
