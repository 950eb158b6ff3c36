use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use garde::Validate;
use serde::Serialize;

use crate::app_state::AppState;
use crate::models::live::LiveResult;
use crate::models::printer::{
    is_valid_id, CreatePrinterRequest, PatchPrinterRequest, PrinterRecord,
};
use crate::routes::error::ApiError;
use crate::routes::guard::AdminAccess;

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

fn checked_id(id: String) -> Result<String, ApiError> {
    if is_valid_id(&id) {
        Ok(id)
    } else {
        Err(ApiError::BadRequest("Invalid printer ID".to_string()))
    }
}

/// GET /api/printers — all printers ordered by name.
pub async fn list_printers(
    State(state): State<AppState>,
) -> Result<Json<Vec<PrinterRecord>>, ApiError> {
    Ok(Json(state.store.list().await?))
}

/// GET /api/printers/{id}
pub async fn get_printer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PrinterRecord>, ApiError> {
    let id = checked_id(id)?;
    Ok(Json(state.store.get(&id).await?))
}

/// GET /api/printers/{id}/live — live device status, reconciled into the store.
pub async fn live_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<LiveResult>, ApiError> {
    let id = checked_id(id)?;
    Ok(Json(state.reconciler.live_status(&id).await?))
}

/// POST /api/printers — add a printer.
pub async fn create_printer(
    _admin: AdminAccess,
    State(state): State<AppState>,
    payload: Result<Json<CreatePrinterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let Json(request) = payload?;
    let printer = request.into_new_printer();
    printer.validate()?;

    let id = state.store.create(printer).await?;
    tracing::info!(printer_id = %id, "Printer added");

    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

/// PATCH /api/printers/{id} — manual status or metadata edit.
pub async fn update_printer(
    _admin: AdminAccess,
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<PatchPrinterRequest>, JsonRejection>,
) -> Result<Json<OkResponse>, ApiError> {
    let id = checked_id(id)?;
    let Json(request) = payload?;
    request.validate()?;

    let update = request
        .into_update(state.clock.now())
        .map_err(ApiError::BadRequest)?;
    let status = update.status;
    let evict = update.affects_live_status();

    state.store.update(&id, update).await?;
    // A manual correction must not be masked by a cached live result.
    if evict {
        state.reconciler.invalidate(&id).await;
    }

    tracing::info!(printer_id = %id, status = ?status, "Printer updated");
    Ok(Json(OkResponse { ok: true }))
}

/// DELETE /api/printers/{id}
pub async fn delete_printer(
    _admin: AdminAccess,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<OkResponse>, ApiError> {
    let id = checked_id(id)?;
    state.store.delete(&id).await?;
    state.reconciler.invalidate(&id).await;

    tracing::info!(printer_id = %id, "Printer deleted");
    Ok(Json(OkResponse { ok: true }))
}
