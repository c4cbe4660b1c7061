#![forbid(unsafe_code)]

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::state::AppState;
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use qc_core::{ChecklistEntry, ChecklistItem, ProductionEntry, UnlockEntry};
use qc_storage::ChecklistBook;
use serde_json::{Value, json};

pub(crate) async fn save(
    State(state): State<AppState>,
    user: CurrentUser,
    body: Result<Json<ChecklistEntry>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    user.require(ChecklistBook::SAVE_ROLE)?;
    let Json(entry) = body.map_err(ApiError::json_body)?;
    let item_number = entry.item_number.clone().unwrap_or_default();
    let item = state
        .blocking(move |services| services.checklists.save(user.principal(), entry))
        .await?
        .map_err(|err| ApiError::checklist("Failed to save checklist", err))?;
    Ok(Json(json!({
        "success": true,
        "message": format!("Item {item_number} saved successfully"),
        "item": item,
    })))
}

pub(crate) async fn save_production(
    State(state): State<AppState>,
    user: CurrentUser,
    body: Result<Json<ProductionEntry>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    user.require(ChecklistBook::SAVE_ROLE)?;
    let Json(entry) = body.map_err(ApiError::json_body)?;
    let item_number = entry.item_number.clone().unwrap_or_default();
    state
        .blocking(move |services| services.checklists.save_production(user.principal(), entry))
        .await?
        .map_err(|err| ApiError::checklist("Failed to save production data", err))?;
    Ok(Json(json!({
        "success": true,
        "message": format!("Production work completed for Item {item_number}"),
    })))
}

pub(crate) async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((stage, wo)): Path<(String, String)>,
) -> Result<Json<Vec<ChecklistItem>>, ApiError> {
    let items = state
        .blocking(move |services| services.checklists.list(user.principal(), &stage, &wo))
        .await?
        .map_err(|err| ApiError::checklist("Error loading checklist data", err))?;
    Ok(Json(items))
}

pub(crate) async fn unlock(
    State(state): State<AppState>,
    user: CurrentUser,
    body: Result<Json<UnlockEntry>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    user.require(ChecklistBook::ADMIN_ROLE)?;
    let Json(entry) = body.map_err(ApiError::json_body)?;
    let item = state
        .blocking(move |services| services.checklists.unlock(user.principal(), entry))
        .await?
        .map_err(|err| ApiError::checklist("Failed to unlock item", err))?;
    Ok(Json(json!({
        "success": true,
        "message": "Item unlocked successfully",
        "item": item,
    })))
}

pub(crate) async fn clear(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((stage, wo)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let message_stage = stage.clone();
    let deleted = state
        .blocking(move |services| services.checklists.clear(user.principal(), &stage, &wo))
        .await?
        .map_err(|err| ApiError::checklist("Error clearing checklist data", err))?;
    Ok(Json(json!({
        "success": true,
        "message": format!("Cleared {deleted} items from {message_stage} checklist"),
        "deletedCount": deleted,
    })))
}
