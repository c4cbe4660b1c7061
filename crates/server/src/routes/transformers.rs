#![forbid(unsafe_code)]

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::state::AppState;
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use qc_core::Role;
use qc_storage::Transformer;
use serde_json::{Map, Value, json};

type Body = Result<Json<Map<String, Value>>, JsonRejection>;

pub(crate) async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<Transformer>>, ApiError> {
    let transformers = state
        .blocking(move |services| services.transformers.list(user.principal()))
        .await?
        .map_err(|err| ApiError::storage("Error loading transformers", err))?;
    Ok(Json(transformers))
}

pub(crate) async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    body: Body,
) -> Result<Json<Value>, ApiError> {
    let acting = user.require(Role::Quality)?.clone();
    let Json(fields) = body.map_err(ApiError::json_body)?;
    let transformer = state
        .blocking(move |services| services.transformers.create(fields, &acting))
        .await?
        .map_err(|err| ApiError::storage("Error adding transformer", err))?;
    Ok(Json(json!({"success": true, "transformer": transformer})))
}

pub(crate) async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    body: Body,
) -> Result<Json<Value>, ApiError> {
    let acting = user.require(Role::Quality)?.clone();
    let Json(patch) = body.map_err(ApiError::json_body)?;
    let updated = state
        .blocking(move |services| services.transformers.update(&id, patch, &acting))
        .await?
        .map_err(|err| ApiError::storage("Error updating transformer", err))?
        .ok_or_else(|| ApiError::not_found("Transformer not found"))?;
    Ok(Json(json!({"success": true, "transformer": updated})))
}

/// Deleting an unknown id still succeeds.
pub(crate) async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    user.require(Role::Admin)?;
    state
        .blocking(move |services| services.transformers.delete(&id))
        .await?
        .map_err(|err| ApiError::storage("Error deleting transformer", err))?;
    Ok(Json(json!({"success": true})))
}
