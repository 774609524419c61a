//! Spreadsheet import handlers

use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::Deserialize;
use tracing::info;

use dre_core::{Error, ImportResult, RawRow};

use crate::{AppError, AppState, MAX_UPLOAD_SIZE};

/// Map core import errors: unreadable input is the caller's fault
fn import_error(err: Error) -> AppError {
    match err {
        Error::UnsupportedFormat(name) => AppError::bad_request(&format!(
            "Unsupported file type: {} (expected .csv, .xlsx, .xlsm, .xls or .ods)",
            name
        )),
        Error::Csv(e) => AppError::bad_request(&format!("Failed to parse CSV: {}", e)),
        Error::Excel(e) => AppError::bad_request(&format!("Failed to parse workbook: {}", e)),
        other => AppError::from(other),
    }
}

fn check_size(len: usize) -> Result<(), AppError> {
    if len > MAX_UPLOAD_SIZE {
        return Err(AppError::bad_request(&format!(
            "File too large. Maximum size is {} MB",
            MAX_UPLOAD_SIZE / 1024 / 1024
        )));
    }
    Ok(())
}

/// POST /api/import - Import a spreadsheet uploaded as multipart form data
///
/// Fields:
/// - file: the spreadsheet (its file name selects the format)
/// - file_name: optional override for the recorded file name
pub async fn import_upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<ImportResult>, AppError> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut upload_name: Option<String> = None;
    let mut name_override: Option<String> = None;

    // Extract fields from multipart form
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request(&format!("Failed to read form field: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                upload_name = field.file_name().map(|s| s.to_string());
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|_| AppError::bad_request("Failed to read file data"))?;
                check_size(bytes.len())?;
                file_data = Some(bytes.to_vec());
            }
            "file_name" => {
                let value = field
                    .text()
                    .await
                    .map_err(|_| AppError::bad_request("Failed to read file_name"))?;
                if !value.trim().is_empty() {
                    name_override = Some(value.trim().to_string());
                }
            }
            _ => {}
        }
    }

    let file_data = file_data.ok_or_else(|| AppError::bad_request("Missing file field"))?;
    let file_name = name_override
        .or(upload_name)
        .ok_or_else(|| AppError::bad_request("Missing file name"))?;

    info!(file = %file_name, bytes = file_data.len(), "Spreadsheet upload received");

    let result = state
        .importer
        .import_bytes(&file_data, &file_name)
        .await
        .map_err(import_error)?;

    Ok(Json(result))
}

/// Spreadsheet carried inline as base64
#[derive(Debug, Deserialize)]
pub struct ImportJsonRequest {
    pub file_name: String,
    /// Base64-encoded file content
    pub file_data: String,
}

/// POST /api/import/json - Import a base64-encoded spreadsheet
pub async fn import_json(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ImportJsonRequest>,
) -> Result<Json<ImportResult>, AppError> {
    use base64::Engine;

    let file_data = base64::engine::general_purpose::STANDARD
        .decode(req.file_data.trim())
        .map_err(|e| AppError::bad_request(&format!("Invalid base64 data: {}", e)))?;

    check_size(file_data.len())?;

    let result = state
        .importer
        .import_bytes(&file_data, &req.file_name)
        .await
        .map_err(import_error)?;

    Ok(Json(result))
}

/// Rows already parsed client-side
#[derive(Debug, Deserialize)]
pub struct ImportRowsRequest {
    pub file_name: String,
    pub rows: Vec<RawRow>,
}

/// POST /api/import/rows - Import rows keyed by column header
pub async fn import_rows(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ImportRowsRequest>,
) -> Result<Json<ImportResult>, AppError> {
    if req.file_name.trim().is_empty() {
        return Err(AppError::bad_request("file_name is required"));
    }

    let result = state.importer.import_rows(&req.rows, &req.file_name).await;
    Ok(Json(result))
}
