//! Intake and read-only dump endpoints.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::Utc;
use serde_json::json;
use service_core::error::AppError;
use service_core::models::CurrentPaymentCode;
use validator::Validate;

use crate::dtos::{CsvRecord, SavePaymentCodeRequest, SavePaymentCodeResponse, StoreRecord};
use crate::services::metrics;
use crate::AppState;

/// Create a payment record: store write, audit-log append, current-code cache
/// patch, in that order. The store write and the cache patch are independently
/// fallible; the response carries the partial-success detail.
pub async fn save_payment_code(
    State(state): State<AppState>,
    Json(request): Json<SavePaymentCodeRequest>,
) -> Result<(StatusCode, Json<SavePaymentCodeResponse>), AppError> {
    request.validate()?;

    let record = request.into_record(Utc::now());

    tracing::info!(
        unique_id = %record.unique_id,
        customer = %record.customer_name(),
        "Processing payment code"
    );

    let store_saved = match state.store.upsert(&record).await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(unique_id = %record.unique_id, "Store write failed: {}", e);
            false
        }
    };

    // The audit log is best-effort; a write failure never fails the request.
    if let Err(e) = state.history.append(&record).await {
        tracing::warn!(unique_id = %record.unique_id, "Failed to log payment code: {}", e);
    }

    let cache_updated = state
        .surface
        .write_current_code(&CurrentPaymentCode::from(&record))
        .await;

    metrics::record_code_saved(store_saved);

    match cache_updated {
        Ok(()) if store_saved => Ok((
            StatusCode::OK,
            Json(SavePaymentCodeResponse {
                message: "Payment code saved to the store and the local cache.".to_string(),
                unique_id: record.unique_id,
                note: Some(
                    "Merchant UPI configuration is preserved; only the current payment code was updated."
                        .to_string(),
                ),
                store_saved: true,
            }),
        )),
        Ok(()) => Ok((
            StatusCode::OK,
            Json(SavePaymentCodeResponse {
                message: "Payment code saved to the local cache but the store write failed."
                    .to_string(),
                unique_id: record.unique_id,
                note: None,
                store_saved: false,
            }),
        )),
        Err(e) => {
            tracing::error!(unique_id = %record.unique_id, "Cache patch failed: {}", e);
            Err(AppError::InternalError(anyhow::anyhow!(
                "Failed to save payment code"
            )))
        }
    }
}

/// The cached current payment code, 404 when the cache block is empty.
pub async fn get_current_payment_code(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    match state.surface.read_current_code().await? {
        Some(code) => Ok((StatusCode::OK, Json(json!(code)))),
        None => Ok((
            StatusCode::NOT_FOUND,
            Json(json!({ "message": "No current payment code found" })),
        )),
    }
}

/// Merchant UPI configuration. Read-only: this service never writes the block.
pub async fn get_upi_config(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    match state.surface.read_upi_config().await? {
        Some(upi_config) => Ok((
            StatusCode::OK,
            Json(json!({
                "upi_config": upi_config,
                "note": "This is the merchant UPI configuration - it is never modified by the services"
            })),
        )),
        None => Ok((
            StatusCode::NOT_FOUND,
            Json(json!({ "message": "No UPI configuration found" })),
        )),
    }
}

/// The local audit log, at most the last 100 created records, oldest first.
pub async fn payment_history(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let entries = state.history.read_all().await?;
    Ok(Json(entries))
}

/// Dump every record in the store, newest first. A store failure degrades to
/// an empty dump rather than an error.
pub async fn store_data(State(state): State<AppState>) -> impl IntoResponse {
    let records = match state.store.list_all().await {
        Ok(records) => records,
        Err(e) => {
            tracing::error!("Failed to read store data: {}", e);
            Vec::new()
        }
    };

    let data: Vec<StoreRecord> = records.into_iter().map(StoreRecord::from).collect();
    Json(json!({
        "store_enabled": true,
        "total_records": data.len(),
        "data": data,
    }))
}

/// Legacy CSV-shaped dump: store data re-keyed with the spreadsheet column
/// names, kept for clients of the retired CSV export.
pub async fn csv_data(State(state): State<AppState>) -> impl IntoResponse {
    let records = match state.store.list_all().await {
        Ok(records) => records,
        Err(e) => {
            tracing::error!("Failed to read store data: {}", e);
            Vec::new()
        }
    };

    let data: Vec<CsvRecord> = records.into_iter().map(CsvRecord::from).collect();
    Json(json!({
        "csv_file": "Migrated to the document store",
        "total_records": data.len(),
        "data": data,
        "note": "Data is now stored in the document store instead of CSV",
    }))
}
